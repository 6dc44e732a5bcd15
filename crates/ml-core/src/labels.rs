//! Closed COCO label vocabulary used by the detection transformer.
//!
//! The table mirrors the 91-entry COCO id→label map shipped with the model
//! checkpoint. Entries removed from the 2014 release are padding (`None`);
//! the final "no object" class of the classifier head is not part of the
//! vocabulary and is dropped during post-processing.

/// COCO id→label table, indexed by class id 0..=90.
const COCO_LABELS: [Option<&str>; 91] = [
    None,
    Some("person"),
    Some("bicycle"),
    Some("car"),
    Some("motorcycle"),
    Some("airplane"),
    Some("bus"),
    Some("train"),
    Some("truck"),
    Some("boat"),
    Some("traffic light"),
    Some("fire hydrant"),
    None,
    Some("stop sign"),
    Some("parking meter"),
    Some("bench"),
    Some("bird"),
    Some("cat"),
    Some("dog"),
    Some("horse"),
    Some("sheep"),
    Some("cow"),
    Some("elephant"),
    Some("bear"),
    Some("zebra"),
    Some("giraffe"),
    None,
    Some("backpack"),
    Some("umbrella"),
    None,
    None,
    Some("handbag"),
    Some("tie"),
    Some("suitcase"),
    Some("frisbee"),
    Some("skis"),
    Some("snowboard"),
    Some("sports ball"),
    Some("kite"),
    Some("baseball bat"),
    Some("baseball glove"),
    Some("skateboard"),
    Some("surfboard"),
    Some("tennis racket"),
    Some("bottle"),
    None,
    Some("wine glass"),
    Some("cup"),
    Some("fork"),
    Some("knife"),
    Some("spoon"),
    Some("bowl"),
    Some("banana"),
    Some("apple"),
    Some("sandwich"),
    Some("orange"),
    Some("broccoli"),
    Some("carrot"),
    Some("hot dog"),
    Some("pizza"),
    Some("donut"),
    Some("cake"),
    Some("chair"),
    Some("couch"),
    Some("potted plant"),
    Some("bed"),
    None,
    Some("dining table"),
    None,
    None,
    Some("toilet"),
    None,
    Some("tv"),
    Some("laptop"),
    Some("mouse"),
    Some("remote"),
    Some("keyboard"),
    Some("cell phone"),
    Some("microwave"),
    Some("oven"),
    Some("toaster"),
    Some("sink"),
    Some("refrigerator"),
    None,
    Some("book"),
    Some("clock"),
    Some("vase"),
    Some("scissors"),
    Some("teddy bear"),
    Some("hair drier"),
    Some("toothbrush"),
];

/// Number of real classes in the vocabulary (padding included).
pub const NUM_CLASSES: usize = COCO_LABELS.len();

/// Look up a class id in the vocabulary.
pub fn label(class_id: u32) -> Option<&'static str> {
    COCO_LABELS.get(class_id as usize).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_resolve() {
        assert_eq!(label(1), Some("person"));
        assert_eq!(label(17), Some("cat"));
        assert_eq!(label(90), Some("toothbrush"));
    }

    #[test]
    fn padding_and_out_of_range_ids_are_none() {
        assert_eq!(label(0), None);
        assert_eq!(label(12), None);
        assert_eq!(label(91), None);
        assert_eq!(label(u32::MAX), None);
    }
}
