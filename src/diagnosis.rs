use serde::{Deserialize, Serialize};

use crate::model::InferenceError;

/// Raw top probability above which a detection is reported as `High`.
pub const HIGH_SEVERITY_THRESHOLD: f32 = 0.90;

const HEALTHY_MARKER: &str = "Healthy";
const HEALTHY_RECOMMENDATION: &str =
    "Keep monitoring. Maintain optimal watering and nutrient levels.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "N/A")]
    NotApplicable,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub disease: String,
    /// Percentage in `[0, 100]`, two decimals.
    pub confidence: f64,
    pub severity: Severity,
    pub recommendation: String,
}

/// Index and value of the highest score. The first index wins ties and NaN never wins.
pub fn top_class(probabilities: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if p <= top => {}
            _ => best = Some((i, p)),
        }
    }
    best
}

impl Diagnosis {
    pub fn from_probabilities<S: AsRef<str>>(
        probabilities: &[f32],
        labels: &[S],
    ) -> Result<Self, InferenceError> {
        if probabilities.len() != labels.len() {
            return Err(InferenceError::LabelMismatch {
                expected: labels.len(),
                actual: probabilities.len(),
            });
        }

        let (index, probability) =
            top_class(probabilities).ok_or(InferenceError::NoUsableScores)?;
        let disease = labels[index].as_ref().to_string();
        // Ties go to even, as Python's round(x, 2) does on exactly representable halves.
        let confidence = (f64::from(probability) * 100.0 * 100.0).round_ties_even() / 100.0;

        let (severity, recommendation) = if disease.contains(HEALTHY_MARKER) {
            (Severity::NotApplicable, HEALTHY_RECOMMENDATION.to_string())
        } else {
            let severity = if probability > HIGH_SEVERITY_THRESHOLD {
                Severity::High
            } else {
                Severity::Medium
            };
            (
                severity,
                format!(
                    "Consult a local agricultural expert for {}. Immediate action is recommended.",
                    disease
                ),
            )
        };

        Ok(Diagnosis {
            disease,
            confidence,
            severity,
            recommendation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CLASS_NAMES;

    #[test]
    fn picks_highest_score() {
        let diagnosis = Diagnosis::from_probabilities(&[0.1, 0.7, 0.2], &CLASS_NAMES).unwrap();
        assert_eq!(diagnosis.disease, "nutrient_deficiency");
        assert_eq!(diagnosis.confidence, 70.0);
        assert_eq!(diagnosis.severity, Severity::Medium);
        assert_eq!(
            diagnosis.recommendation,
            "Consult a local agricultural expert for nutrient_deficiency. Immediate action is recommended."
        );
    }

    #[test]
    fn confidence_is_rounded_to_two_decimals() {
        let diagnosis =
            Diagnosis::from_probabilities(&[0.123456, 0.8, 0.076544], &CLASS_NAMES).unwrap();
        assert_eq!(diagnosis.disease, "nutrient_deficiency");
        assert_eq!(diagnosis.confidence, 80.0);

        let diagnosis =
            Diagnosis::from_probabilities(&[0.456789, 0.3, 0.243211], &CLASS_NAMES).unwrap();
        assert_eq!(diagnosis.confidence, 45.68);
    }

    #[test]
    fn confidence_ties_round_to_even() {
        // 1/32 is exact in binary: 3.125% sits on the tie.
        let diagnosis = Diagnosis::from_probabilities(&[0.03125], &["others"]).unwrap();
        assert_eq!(diagnosis.confidence, 3.12);

        // 3/32 -> 9.375%, tie rounds up to the even digit.
        let diagnosis = Diagnosis::from_probabilities(&[0.09375], &["others"]).unwrap();
        assert_eq!(diagnosis.confidence, 9.38);
    }

    #[test]
    fn all_nan_scores_are_not_usable() {
        let scores = [f32::NAN; 3];
        let err = Diagnosis::from_probabilities(&scores, &CLASS_NAMES).unwrap_err();
        assert!(matches!(err, InferenceError::NoUsableScores));
        assert_eq!(err.to_string(), "model returned no usable scores");
    }

    #[test]
    fn exactly_ninety_percent_is_medium() {
        let diagnosis = Diagnosis::from_probabilities(&[0.90, 0.05, 0.05], &CLASS_NAMES).unwrap();
        assert_eq!(diagnosis.disease, "anthracnose");
        assert_eq!(diagnosis.severity, Severity::Medium);
    }

    #[test]
    fn above_ninety_percent_is_high() {
        let diagnosis =
            Diagnosis::from_probabilities(&[0.02, 0.03, 0.9001], &CLASS_NAMES).unwrap();
        assert_eq!(diagnosis.disease, "others");
        assert_eq!(diagnosis.severity, Severity::High);
        assert_eq!(diagnosis.confidence, 90.01);
    }

    #[test]
    fn healthy_labels_have_no_severity() {
        let labels = ["Healthy_leaf", "anthracnose"];
        let diagnosis = Diagnosis::from_probabilities(&[0.99, 0.01], &labels).unwrap();
        assert_eq!(diagnosis.severity, Severity::NotApplicable);
        assert_eq!(diagnosis.recommendation, HEALTHY_RECOMMENDATION);
    }

    #[test]
    fn configured_labels_never_hit_the_healthy_branch() {
        assert!(CLASS_NAMES.iter().all(|l| !l.contains(HEALTHY_MARKER)));
    }

    #[test]
    fn ties_resolve_to_first_index() {
        assert_eq!(top_class(&[0.4, 0.4, 0.2]), Some((0, 0.4)));
        assert_eq!(top_class(&[f32::NAN, 0.1, 0.3]), Some((2, 0.3)));
        assert_eq!(top_class(&[]), None);
    }

    #[test]
    fn output_length_must_match_labels() {
        let err = Diagnosis::from_probabilities(&[0.5, 0.5], &CLASS_NAMES).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::LabelMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn serializes_documented_fields() {
        let diagnosis = Diagnosis::from_probabilities(&[0.95, 0.03, 0.02], &CLASS_NAMES).unwrap();
        let value = serde_json::to_value(&diagnosis).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 4);
        assert_eq!(value["disease"], "anthracnose");
        assert_eq!(value["confidence"], 95.0);
        assert_eq!(value["severity"], "High");

        let na = serde_json::to_value(Severity::NotApplicable).unwrap();
        assert_eq!(na, "N/A");
    }
}
