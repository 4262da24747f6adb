//! Detector label tables
//!
//! Constants only. The obstacle list is versioned with the engine; adding a
//! label changes which photos classify as obstruction.

/// Labels of everyday objects that block walkways or exits.
/// Kept sorted for `binary_search`.
pub const OBSTACLE_CLASSES: &[&str] = &[
    "backpack",
    "baseball bat",
    "bed",
    "bench",
    "bicycle",
    "book",
    "bottle",
    "bus",
    "car",
    "chair",
    "clock",
    "couch",
    "cup",
    "dining table",
    "fire hydrant",
    "hair drier",
    "handbag",
    "kite",
    "laptop",
    "microwave",
    "motorcycle",
    "oven",
    "parking meter",
    "potted plant",
    "refrigerator",
    "scissors",
    "sink",
    "skateboard",
    "sports ball",
    "stop sign",
    "suitcase",
    "surfboard",
    "teddy bear",
    "tennis racket",
    "toaster",
    "toilet",
    "toothbrush",
    "traffic light",
    "truck",
    "tv",
    "umbrella",
    "vase",
];

pub fn is_obstacle(label: &str) -> bool {
    OBSTACLE_CLASSES.binary_search(&label).is_ok()
}

/// Human-readable name for a detector label. Unknown labels pass through.
pub fn display_name(label: &str) -> &str {
    match label {
        "tv" => "television",
        "cup" => "cup/glass",
        "potted plant" => "plant",
        "dining table" => "table",
        "couch" => "sofa",
        "hair drier" => "hair dryer",
        "sports ball" => "ball",
        "cell_phone" | "cell phone" => "mobile phone",
        "remote" => "remote control",
        "mouse" => "computer mouse",
        "fire hydrant" => "hydrant",
        "motorcycle" => "motorbike",
        "refrigerator" => "fridge",
        "teddy bear" => "stuffed toy",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obstacle_list_sorted_and_unique() {
        assert!(OBSTACLE_CLASSES.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(OBSTACLE_CLASSES.len(), 42);
    }

    #[test]
    fn test_obstacle_membership() {
        assert!(is_obstacle("chair"));
        assert!(is_obstacle("potted plant"));
        assert!(is_obstacle("vase"));
        assert!(!is_obstacle("person"));
        assert!(!is_obstacle("Chair"));
        assert!(!is_obstacle("banana"));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(display_name("dining table"), "table");
        assert_eq!(display_name("chair"), "chair");
        assert_eq!(display_name("forklift"), "forklift");
    }
}
