//! Synthetic landmark sets for tests

use crate::domain::landmark::*;

fn set(points: &mut [Option<Landmark>], idx: usize, x: f64, y: f64) {
    points[idx] = Some(Landmark::new(x, y));
}

/// Upright body facing the camera, arms hanging at the sides
pub fn standing() -> Vec<Option<Landmark>> {
    let mut p = vec![None; LANDMARK_COUNT];
    set(&mut p, NOSE, 0.5, 0.15);
    for (idx, x) in [
        (LEFT_EYE_INNER, 0.49),
        (LEFT_EYE, 0.48),
        (LEFT_EYE_OUTER, 0.47),
        (RIGHT_EYE_INNER, 0.51),
        (RIGHT_EYE, 0.52),
        (RIGHT_EYE_OUTER, 0.53),
    ] {
        set(&mut p, idx, x, 0.13);
    }
    set(&mut p, LEFT_EAR, 0.46, 0.14);
    set(&mut p, RIGHT_EAR, 0.54, 0.14);
    set(&mut p, MOUTH_LEFT, 0.49, 0.18);
    set(&mut p, MOUTH_RIGHT, 0.51, 0.18);

    set(&mut p, LEFT_SHOULDER, 0.4, 0.3);
    set(&mut p, RIGHT_SHOULDER, 0.6, 0.3);
    set(&mut p, LEFT_ELBOW, 0.4, 0.45);
    set(&mut p, RIGHT_ELBOW, 0.6, 0.45);
    set(&mut p, LEFT_WRIST, 0.4, 0.6);
    set(&mut p, RIGHT_WRIST, 0.6, 0.6);
    set(&mut p, LEFT_PINKY, 0.4, 0.63);
    set(&mut p, RIGHT_PINKY, 0.6, 0.63);
    set(&mut p, LEFT_INDEX, 0.4, 0.64);
    set(&mut p, RIGHT_INDEX, 0.6, 0.64);
    set(&mut p, LEFT_THUMB, 0.41, 0.62);
    set(&mut p, RIGHT_THUMB, 0.59, 0.62);

    set(&mut p, LEFT_HIP, 0.4, 0.6);
    set(&mut p, RIGHT_HIP, 0.6, 0.6);
    set(&mut p, LEFT_KNEE, 0.4, 0.8);
    set(&mut p, RIGHT_KNEE, 0.6, 0.8);
    set(&mut p, LEFT_ANKLE, 0.4, 1.0);
    set(&mut p, RIGHT_ANKLE, 0.6, 1.0);
    set(&mut p, LEFT_HEEL, 0.4, 1.02);
    set(&mut p, RIGHT_HEEL, 0.6, 1.02);
    set(&mut p, LEFT_FOOT_INDEX, 0.37, 1.0);
    set(&mut p, RIGHT_FOOT_INDEX, 0.63, 1.0);
    p
}

/// Arms straight out to the sides at shoulder height
pub fn t_pose() -> Vec<Option<Landmark>> {
    let mut p = standing();
    set(&mut p, LEFT_ELBOW, 0.3, 0.3);
    set(&mut p, LEFT_WRIST, 0.2, 0.3);
    set(&mut p, RIGHT_ELBOW, 0.7, 0.3);
    set(&mut p, RIGHT_WRIST, 0.8, 0.3);
    p
}

/// Arms straight overhead
pub fn arms_up() -> Vec<Option<Landmark>> {
    let mut p = standing();
    set(&mut p, LEFT_ELBOW, 0.4, 0.15);
    set(&mut p, LEFT_WRIST, 0.4, 0.0);
    set(&mut p, RIGHT_ELBOW, 0.6, 0.15);
    set(&mut p, RIGHT_WRIST, 0.6, 0.0);
    p
}
