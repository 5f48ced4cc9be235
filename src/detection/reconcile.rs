use crate::models::{DamageClass, Detection, DetectionSet};

/// Outcome of reconciling the two detector outputs: the winning class, its
/// confidence, and which detections to render.
#[derive(Debug)]
pub struct Verdict<'a> {
    pub class: DamageClass,
    pub confidence: f32,
    pub to_draw: &'a [Detection],
}

/// Reconcile the pothole and waste detector outputs into a single damage
/// classification. Deterministic and pure; ties favor pothole.
///
/// The rule, in order:
/// 1. pothole wins when it has at least as many detections AND at least the
///    waste confidence AND a non-zero count;
/// 2. otherwise waste wins when it has any detection;
/// 3. otherwise there is no damage, confidence 0, nothing to draw.
///
/// Per-class confidence is the maximum over that class's retained detections
/// (0 when the class has none), so both counts zero always lands on `None`.
pub fn reconcile<'a>(pothole: &'a DetectionSet, waste: &'a DetectionSet) -> Verdict<'a> {
    let pothole_conf = pothole.max_confidence();
    let waste_conf = waste.max_confidence();

    if pothole.count() >= waste.count() && pothole_conf >= waste_conf && pothole.count() > 0 {
        Verdict {
            class: DamageClass::Pothole,
            confidence: pothole_conf,
            to_draw: &pothole.detections,
        }
    } else if waste.count() > 0 {
        Verdict {
            class: DamageClass::Waste,
            confidence: waste_conf,
            to_draw: &waste.detections,
        }
    } else {
        Verdict {
            class: DamageClass::None,
            confidence: 0.0,
            to_draw: &[],
        }
    }
}
