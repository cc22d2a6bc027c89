use std::sync::Arc;

use super::Frame;

/// Frame replacement strategy for the buffer pool.
///
/// Every variant picks its victim among the unpinned frames only; when all
/// frames are pinned there is no victim and the pin fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementPolicy {
    /// First unpinned frame in insertion order
    Fifo,
    /// Unpinned frame with the oldest last-touch tick
    Lru,
    /// Second-chance sweep over a circular hand
    Clock,
    /// Unpinned frame with the fewest pins, ties broken by oldest touch
    Lfu,
}

impl ReplacementPolicy {
    /// Picks the index of the victim frame, or None when every frame is
    /// pinned. Only the Clock policy advances `clock_hand`.
    pub(crate) fn pick_victim(
        &self,
        frames: &[Arc<Frame>],
        clock_hand: &mut usize,
    ) -> Option<usize> {
        match self {
            ReplacementPolicy::Fifo => frames.iter().position(|f| f.pin_count() == 0),

            ReplacementPolicy::Lru => frames
                .iter()
                .enumerate()
                .filter(|(_, f)| f.pin_count() == 0)
                .min_by_key(|(_, f)| f.last_touch())
                .map(|(i, _)| i),

            ReplacementPolicy::Clock => {
                // Two full sweeps suffice: the first clears reference bits,
                // the second must land on an unpinned frame if one exists.
                let n = frames.len();
                for _ in 0..2 * n {
                    let i = *clock_hand % n;
                    *clock_hand = (*clock_hand + 1) % n;

                    let f = &frames[i];
                    if f.pin_count() > 0 {
                        continue;
                    }
                    if f.ref_bit() {
                        f.clear_ref_bit();
                        continue;
                    }
                    return Some(i);
                }
                None
            }

            ReplacementPolicy::Lfu => frames
                .iter()
                .enumerate()
                .filter(|(_, f)| f.pin_count() == 0)
                .min_by_key(|(_, f)| (f.ref_count(), f.last_touch()))
                .map(|(i, _)| i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{PageId, PAGE_SIZE};

    fn frame(page: u32, tick: u64) -> Arc<Frame> {
        let f = Arc::new(Frame::new(
            PageId::new(page),
            Box::new([0u8; PAGE_SIZE]),
            tick,
        ));
        f.unpin();
        f
    }

    #[test]
    fn test_fifo_picks_first_unpinned() {
        let frames = vec![frame(0, 1), frame(1, 2), frame(2, 3)];
        frames[0].pin();

        let mut hand = 0;
        assert_eq!(
            ReplacementPolicy::Fifo.pick_victim(&frames, &mut hand),
            Some(1)
        );
    }

    #[test]
    fn test_lru_picks_oldest_touch() {
        let frames = vec![frame(0, 5), frame(1, 2), frame(2, 9)];

        let mut hand = 0;
        assert_eq!(
            ReplacementPolicy::Lru.pick_victim(&frames, &mut hand),
            Some(1)
        );
    }

    #[test]
    fn test_all_pinned_yields_none() {
        let frames = vec![frame(0, 1), frame(1, 2)];
        frames[0].pin();
        frames[1].pin();

        let mut hand = 0;
        for policy in [
            ReplacementPolicy::Fifo,
            ReplacementPolicy::Lru,
            ReplacementPolicy::Clock,
            ReplacementPolicy::Lfu,
        ] {
            assert_eq!(policy.pick_victim(&frames, &mut hand), None);
        }
    }

    #[test]
    fn test_clock_second_chance() {
        let frames = vec![frame(0, 1), frame(1, 2), frame(2, 3)];
        // all reference bits start set; the sweep clears 0, 1, 2 and then
        // picks frame 0 on the second pass
        let mut hand = 0;
        assert_eq!(
            ReplacementPolicy::Clock.pick_victim(&frames, &mut hand),
            Some(0)
        );
        // frame 1's bit was cleared by the first sweep, so it goes next
        assert_eq!(
            ReplacementPolicy::Clock.pick_victim(&frames, &mut hand),
            Some(1)
        );
    }

    #[test]
    fn test_lfu_picks_least_referenced() {
        let frames = vec![frame(0, 1), frame(1, 2), frame(2, 3)];
        frames[0].touch(4);
        frames[0].touch(5);
        frames[2].touch(6);

        let mut hand = 0;
        assert_eq!(
            ReplacementPolicy::Lfu.pick_victim(&frames, &mut hand),
            Some(1)
        );
    }
}
