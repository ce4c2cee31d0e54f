use tracing::debug;

use crate::types::{
    action::{ClaimCommand, ClaimSide},
    primitives::{AuctionIndex, Direction},
    snapshot::{AuctionSnapshot, ClaimWindow, RoundRange},
};

/// Last round per direction known to be settled. Only narrows the scan;
/// claiming an already settled round is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClaimCursor {
    pub forward: AuctionIndex,
    pub reverse: AuctionIndex,
}

impl ClaimCursor {
    pub fn new(start: AuctionIndex) -> Self {
        Self {
            forward: start,
            reverse: start,
        }
    }

    pub fn get(&self, direction: Direction) -> AuctionIndex {
        match direction {
            Direction::Forward => self.forward,
            Direction::Reverse => self.reverse,
        }
    }

    fn slot(&mut self, direction: Direction) -> &mut AuctionIndex {
        match direction {
            Direction::Forward => &mut self.forward,
            Direction::Reverse => &mut self.reverse,
        }
    }

    /// Rounds strictly after the cursor and strictly before the current
    /// index, at most `scan_limit` of them per direction.
    pub fn window(
        &self,
        forward_current: AuctionIndex,
        reverse_current: AuctionIndex,
        scan_limit: u64,
    ) -> ClaimWindow {
        ClaimWindow {
            forward: scan_range(self.forward, forward_current, scan_limit),
            reverse: scan_range(self.reverse, reverse_current, scan_limit),
        }
    }

    /// Moves each direction past the longest prefix of the scanned window
    /// that holds nothing left to claim later. A round that has not closed
    /// while the holder still has a stake in it stops the advance.
    pub fn advance(&mut self, snapshot: &AuctionSnapshot) {
        for direction in [Direction::Forward, Direction::Reverse] {
            let range = snapshot.claim_window.range(direction);
            let mut settled = self.get(direction);
            for round in range.rounds() {
                let blocking = snapshot
                    .positions_for(direction)
                    .find(|position| position.round == round)
                    .is_some_and(|position| !position.is_closed() && !position.is_empty());
                if blocking {
                    debug!(?direction, %round, "claim cursor held at open round");
                    break;
                }
                settled = round;
            }
            let slot = self.slot(direction);
            if settled > *slot {
                *slot = settled;
            }
        }
    }
}

fn scan_range(cursor: AuctionIndex, current: AuctionIndex, scan_limit: u64) -> RoundRange {
    if scan_limit == 0 || current <= cursor.next() {
        return RoundRange::empty();
    }
    let first = cursor.next();
    let last = current
        .prev()
        .min(AuctionIndex::new(cursor.as_u64().saturating_add(scan_limit)));
    RoundRange { first, last }
}

/// Claims owed to the snapshot's holder: forward rounds ascending, then
/// reverse rounds ascending, seller side before buyer side.
pub fn pending_claims(snapshot: &AuctionSnapshot, cursor: &ClaimCursor) -> Vec<ClaimCommand> {
    let mut commands = Vec::new();
    for direction in [Direction::Forward, Direction::Reverse] {
        let after = cursor.get(direction);
        let current = snapshot.current_index(direction);
        let pair = snapshot.pair_for(direction);

        let mut positions: Vec<_> = snapshot
            .positions_for(direction)
            .filter(|position| position.round > after && position.round < current)
            .collect();
        positions.sort_by_key(|position| position.round);

        for position in positions {
            if !position.is_closed() {
                debug!(?direction, round = %position.round, "round not closed, skipping claim");
                continue;
            }
            let sides = [
                (ClaimSide::Seller, position.seller_balance),
                (ClaimSide::Buyer, position.buyer_balance),
            ];
            for (side, balance) in sides {
                if balance.is_zero() {
                    continue;
                }
                commands.push(ClaimCommand {
                    direction,
                    pair,
                    round: position.round,
                    side,
                    holder: snapshot.holder,
                });
            }
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        testkit::snapshot_fixture,
        types::{primitives::TokenAmount, rational::Rational, snapshot::AccountPosition},
    };

    fn position(
        direction: Direction,
        round: u64,
        seller: u64,
        buyer: u64,
        closed: bool,
    ) -> AccountPosition {
        AccountPosition {
            direction,
            round: AuctionIndex::new(round),
            seller_balance: TokenAmount::from(seller),
            buyer_balance: TokenAmount::from(buyer),
            closing_price: closed.then(|| Rational::from_u64(1, 1).unwrap()),
        }
    }

    fn snapshot_with(current: u64, positions: Vec<AccountPosition>) -> AuctionSnapshot {
        let mut snapshot = snapshot_fixture();
        snapshot.auction_index = AuctionIndex::new(current);
        snapshot.reverse_auction_index = AuctionIndex::new(current);
        snapshot.claim_window =
            ClaimCursor::default().window(snapshot.auction_index, snapshot.reverse_auction_index, 64);
        snapshot.positions = positions;
        snapshot
    }

    #[test]
    fn window_respects_cursor_and_limit() {
        let cursor = ClaimCursor::new(AuctionIndex::new(2));
        let window = cursor.window(AuctionIndex::new(10), AuctionIndex::new(3), 4);
        assert_eq!(window.forward.first, AuctionIndex::new(3));
        assert_eq!(window.forward.last, AuctionIndex::new(6));
        assert!(window.reverse.is_empty());
        assert!(cursor.window(AuctionIndex::new(10), AuctionIndex::new(10), 0).forward.is_empty());
    }

    #[test]
    fn window_is_empty_for_a_cursor_at_the_last_round() {
        let cursor = ClaimCursor::new(AuctionIndex::new(u64::MAX));
        let window = cursor.window(AuctionIndex::new(u64::MAX), AuctionIndex::new(3), 32);
        assert!(window.forward.is_empty());
        assert!(window.reverse.is_empty());
    }

    #[test]
    fn claims_every_nonzero_side_and_none_of_the_zero_ones() {
        let snapshot = snapshot_with(
            5,
            vec![
                position(Direction::Forward, 1, 10, 0, true),
                position(Direction::Forward, 2, 0, 0, true),
                position(Direction::Forward, 3, 4, 7, true),
                position(Direction::Reverse, 2, 0, 9, true),
                position(Direction::Reverse, 4, 0, 0, true),
            ],
        );

        let claims = pending_claims(&snapshot, &ClaimCursor::default());
        let summary: Vec<_> = claims
            .iter()
            .map(|c| (c.direction, c.round.as_u64(), c.side))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Direction::Forward, 1, ClaimSide::Seller),
                (Direction::Forward, 3, ClaimSide::Seller),
                (Direction::Forward, 3, ClaimSide::Buyer),
                (Direction::Reverse, 2, ClaimSide::Buyer),
            ]
        );
        assert_eq!(claims[3].pair, snapshot.pair.reversed());
    }

    #[test]
    fn open_rounds_are_skipped_and_hold_the_cursor() {
        let snapshot = snapshot_with(
            5,
            vec![
                position(Direction::Forward, 1, 10, 0, true),
                position(Direction::Forward, 2, 3, 0, false),
                position(Direction::Forward, 3, 8, 0, true),
            ],
        );

        let claims = pending_claims(&snapshot, &ClaimCursor::default());
        assert_eq!(claims.len(), 2);
        assert!(claims.iter().all(|c| c.round != AuctionIndex::new(2)));

        let mut cursor = ClaimCursor::default();
        cursor.advance(&snapshot);
        assert_eq!(cursor.forward, AuctionIndex::new(1));
        assert_eq!(cursor.reverse, AuctionIndex::new(4));
    }

    #[test]
    fn advanced_cursor_makes_second_pass_empty() {
        let snapshot = snapshot_with(
            4,
            vec![
                position(Direction::Forward, 1, 10, 0, true),
                position(Direction::Forward, 3, 0, 2, true),
            ],
        );
        let mut cursor = ClaimCursor::default();
        assert_eq!(pending_claims(&snapshot, &cursor).len(), 2);
        cursor.advance(&snapshot);
        assert!(pending_claims(&snapshot, &cursor).is_empty());
    }

    #[test]
    fn current_round_is_never_claimed() {
        let snapshot = snapshot_with(3, vec![position(Direction::Forward, 3, 10, 0, true)]);
        assert!(pending_claims(&snapshot, &ClaimCursor::default()).is_empty());
    }
}
