//! The save/load option bitmask (spec section 6).
//!
//! Bit ordering is fixed; new bits must only ever be appended. The bitmask
//! itself is round-tripped verbatim through the header's `options` field.

use bitflags::bitflags;

bitflags! {
    /// Options controlling what gets written/read and how.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
    #[serde(transparent)]
    pub struct Options: u32 {
        /// Write features as a length-delimited stream; also set automatically
        /// when the feature count exceeds [`crate::artifact::FEATURE_MESSAGE_LIMIT`].
        const FEATURES_FILE_DELIMITED     = 1 << 0;
        /// Force a single-record features file, overriding the size-based decision.
        const FEATURES_FILE_NOT_DELIMITED = 1 << 1;
        /// Skip the landmarks artifact (diagnostic only).
        const NO_MAPPOINTS_FILE           = 1 << 2;
        /// Skip the keyframes artifact (diagnostic only).
        const NO_KEYFRAMES_FILE           = 1 << 3;
        /// Skip the features artifact (diagnostic only).
        const NO_FEATURES_FILE            = 1 << 4;
        /// Omit per-feature descriptors; rely on the per-landmark descriptor.
        const NO_FEATURES_DESCRIPTORS     = 1 << 5;
        /// Omit features with no owning landmark.
        const ONLY_MAPPOINTS_FEATURES     = 1 << 6;
        /// Skip emitting and restoring loop edges entirely.
        const NO_LOOPS                    = 1 << 7;
        /// Emit intrinsics inline per keyframe instead of a header table.
        const K_IN_KEYFRAME               = 1 << 8;
        /// Skip the pre-write depuration pass.
        const NO_DEPURATION               = 1 << 9;
        /// Skip bad-flag assignment during rebuild.
        const NO_SET_BAD                  = 1 << 10;
        /// Disable landmark reclamation in the depurator.
        const NO_APPEND_FOUND_MAPPOINTS   = 1 << 11;
    }
}

/// Human-readable names of the options active in `opts`, in bit order.
///
/// This is the `Options descriptions` field of the header (spec section 6):
/// informational only, never parsed back on load. Mirrors osmap's
/// options-used diagnostic comment in its header writer.
pub fn describe(opts: Options) -> Vec<&'static str> {
    const NAMED: &[(Options, &str)] = &[
        (Options::FEATURES_FILE_DELIMITED, "FEATURES_FILE_DELIMITED"),
        (Options::FEATURES_FILE_NOT_DELIMITED, "FEATURES_FILE_NOT_DELIMITED"),
        (Options::NO_MAPPOINTS_FILE, "NO_MAPPOINTS_FILE"),
        (Options::NO_KEYFRAMES_FILE, "NO_KEYFRAMES_FILE"),
        (Options::NO_FEATURES_FILE, "NO_FEATURES_FILE"),
        (Options::NO_FEATURES_DESCRIPTORS, "NO_FEATURES_DESCRIPTORS"),
        (Options::ONLY_MAPPOINTS_FEATURES, "ONLY_MAPPOINTS_FEATURES"),
        (Options::NO_LOOPS, "NO_LOOPS"),
        (Options::K_IN_KEYFRAME, "K_IN_KEYFRAME"),
        (Options::NO_DEPURATION, "NO_DEPURATION"),
        (Options::NO_SET_BAD, "NO_SET_BAD"),
        (Options::NO_APPEND_FOUND_MAPPOINTS, "NO_APPEND_FOUND_MAPPOINTS"),
    ];
    NAMED
        .iter()
        .filter(|(bit, _)| opts.contains(*bit))
        .map(|(_, name)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_only_set_bits() {
        let opts = Options::NO_LOOPS | Options::K_IN_KEYFRAME;
        let names = describe(opts);
        assert_eq!(names, vec!["NO_LOOPS", "K_IN_KEYFRAME"]);
    }

    #[test]
    fn describe_empty_is_empty() {
        assert!(describe(Options::empty()).is_empty());
    }

    #[test]
    fn bits_round_trip_through_u32() {
        let opts = Options::NO_DEPURATION | Options::NO_FEATURES_FILE;
        let bits = opts.bits();
        let restored = Options::from_bits_truncate(bits);
        assert_eq!(opts, restored);
    }
}
