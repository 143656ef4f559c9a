/// Guard added to IoU denominators and used as the logit clamp bound.
pub const EPSILON: f64 = 1e-9;
