use super::{primitives::Timestamp, snapshot::AuctionSnapshot};

/// `auctionStart` value the exchange stores while a pair waits for enough
/// sell volume. Zero means the pair never had a round scheduled.
pub const AUCTION_START_WAITING_FOR_FUNDING: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationState {
    NoAuctionTriggered,
    AuctionTriggeredWaiting { starts_at: Timestamp },
    AuctionInProgress,
}

impl ParticipationState {
    pub fn classify(snapshot: &AuctionSnapshot) -> Self {
        Self::from_times(snapshot.auction_start, snapshot.current_time)
    }

    /// A cleared round shows up as the exchange resetting `auction_start`
    /// to the sentinel, which lands back in the first arm.
    pub fn from_times(auction_start: Timestamp, now: Timestamp) -> Self {
        if auction_start.as_u64() <= AUCTION_START_WAITING_FOR_FUNDING {
            Self::NoAuctionTriggered
        } else if now < auction_start {
            Self::AuctionTriggeredWaiting {
                starts_at: auction_start,
            }
        } else {
            Self::AuctionInProgress
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAuctionTriggered => "no_auction_triggered",
            Self::AuctionTriggeredWaiting { .. } => "auction_triggered_waiting",
            Self::AuctionInProgress => "auction_in_progress",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(start: u64, now: u64) -> ParticipationState {
        ParticipationState::from_times(Timestamp::new(start), Timestamp::new(now))
    }

    #[test]
    fn sentinels_mean_nothing_triggered() {
        assert_eq!(classify(0, 0), ParticipationState::NoAuctionTriggered);
        assert_eq!(classify(0, 5_000), ParticipationState::NoAuctionTriggered);
        assert_eq!(classify(1, 5_000), ParticipationState::NoAuctionTriggered);
    }

    #[test]
    fn future_start_is_waiting() {
        assert_eq!(
            classify(2_000, 1_999),
            ParticipationState::AuctionTriggeredWaiting {
                starts_at: Timestamp::new(2_000)
            }
        );
    }

    #[test]
    fn start_reached_is_in_progress() {
        assert_eq!(classify(2_000, 2_000), ParticipationState::AuctionInProgress);
        assert_eq!(classify(2_000, 9_000), ParticipationState::AuctionInProgress);
    }

    #[test]
    fn classification_is_deterministic() {
        for (start, now) in [(0, 0), (1, 10), (50, 10), (50, 50), (50, 51)] {
            assert_eq!(classify(start, now), classify(start, now));
        }
    }
}
