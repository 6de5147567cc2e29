use super::frame::IpHeaderView;

/// Coarse fragmentation state of a captured IPv4 datagram.
///
/// Middle fragments (more-fragments set, nonzero offset) fall under
/// `FirstFragment`: the flag alone decides, no reassembly state is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentState {
    NonFragment,
    FirstFragment,
    LastFragment,
}

impl FragmentState {
    pub fn from_fields(more_fragments: bool, offset: u16) -> Self {
        match (more_fragments, offset) {
            (true, _) => Self::FirstFragment,
            (false, 0) => Self::NonFragment,
            (false, _) => Self::LastFragment,
        }
    }

    pub fn is_fragment(self) -> bool {
        self != Self::NonFragment
    }
}

pub fn classify(ip: &IpHeaderView<'_>) -> FragmentState {
    FragmentState::from_fields(ip.more_fragments(), ip.fragment_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radar::frame::tests::FrameBuilder;
    use crate::radar::frame::{CapturedFrame, ETH_HLEN, decode};

    fn classify_bytes(data: &[u8]) -> FragmentState {
        let frame = CapturedFrame::new(data, data.len() as u32);
        classify(&decode(&frame, ETH_HLEN).unwrap().ip)
    }

    #[test]
    fn unfragmented_datagram() {
        let data = FrameBuilder::new().build();
        assert_eq!(classify_bytes(&data), FragmentState::NonFragment);
    }

    #[test]
    fn more_fragments_with_zero_offset_is_first() {
        let data = FrameBuilder::new().more_fragments(true).build();
        assert_eq!(classify_bytes(&data), FragmentState::FirstFragment);
    }

    #[test]
    fn middle_fragment_counts_as_first() {
        let data = FrameBuilder::new()
            .more_fragments(true)
            .fragment_offset(185)
            .build();
        assert_eq!(classify_bytes(&data), FragmentState::FirstFragment);
    }

    #[test]
    fn trailing_fragment_is_last() {
        let data = FrameBuilder::new().fragment_offset(40).build();
        assert_eq!(classify_bytes(&data), FragmentState::LastFragment);
    }

    #[test]
    fn from_fields_truth_table() {
        assert_eq!(FragmentState::from_fields(false, 0), FragmentState::NonFragment);
        assert_eq!(FragmentState::from_fields(false, 1), FragmentState::LastFragment);
        assert_eq!(FragmentState::from_fields(true, 0), FragmentState::FirstFragment);
        assert_eq!(FragmentState::from_fields(true, 0x1fff), FragmentState::FirstFragment);
        assert!(!FragmentState::NonFragment.is_fragment());
        assert!(FragmentState::LastFragment.is_fragment());
    }
}
