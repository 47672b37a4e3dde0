use proptest::prelude::*;

use accord_shared::{OrderedReceiver, SequenceNumber};

/// A run of consecutive sequence numbers starting anywhere, including just
/// before the wrap, arriving shuffled with some of them repeated
fn arrivals() -> impl Strategy<Value = (SequenceNumber, usize, Vec<usize>)> {
    (any::<u16>(), 1usize..200).prop_flat_map(|(start, count)| {
        let order = (0..count).collect::<Vec<_>>();
        let repeats = prop::collection::vec(0..count, 0..count);
        (Just(start), Just(count), (Just(order).prop_shuffle(), repeats))
            .prop_map(|(start, count, (mut order, repeats))| {
                for (at, index) in repeats.into_iter().enumerate() {
                    let position = (at * 7) % (order.len() + 1);
                    order.insert(position, index);
                }
                (start, count, order)
            })
    })
}

proptest! {
    #[test]
    fn every_invocation_is_delivered_once_in_order((start, count, order) in arrivals()) {
        let mut receiver = OrderedReceiver::starting_at(start);
        let mut delivered = Vec::new();
        for index in &order {
            let sequence = start.wrapping_add(*index as u16);
            delivered.extend(receiver.receive(sequence, *index));
        }

        prop_assert_eq!(delivered, (0..count).collect::<Vec<_>>());
        prop_assert_eq!(receiver.pending(), 0);
        prop_assert_eq!(receiver.duplicates(), (order.len() - count) as u64);
        prop_assert_eq!(receiver.next_expected(), start.wrapping_add(count as u16));
    }

    #[test]
    fn nothing_is_delivered_past_a_gap(missing in 0usize..50, count in 51usize..100) {
        let mut receiver = OrderedReceiver::new();
        let mut delivered = Vec::new();
        for index in (0..count).filter(|index| *index != missing) {
            delivered.extend(receiver.receive(index as u16, index));
        }

        prop_assert_eq!(delivered, (0..missing).collect::<Vec<_>>());
        prop_assert_eq!(receiver.pending(), count - missing - 1);
        prop_assert_eq!(receiver.next_expected(), missing as u16);
    }
}
