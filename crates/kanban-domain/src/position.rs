//! Position ledger.
//!
//! Positions inside a scope (a board's columns, or a column's active
//! cards) always form the dense sequence `0..len`. The functions here plan
//! the renumbering an operation needs; they never touch storage. A store
//! executes the returned [`Shift`]s and the primary write inside one
//! transaction.

use kanban_core::{KanbanError, KanbanResult};
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

pub type Position = i32;

/// Inclusive range of positions, open-ended when `end` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRange {
    pub start: Position,
    pub end: Option<Position>,
}

impl PositionRange {
    /// `[start, ∞)`
    pub fn from(start: Position) -> Self {
        Self { start, end: None }
    }

    /// `(position, ∞)`
    pub fn after(position: Position) -> Self {
        Self::from(position + 1)
    }

    /// `[start, end]`
    pub fn between(start: Position, end: Position) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        position >= self.start && self.end.map_or(true, |end| position <= end)
    }

    pub fn is_empty(&self) -> bool {
        self.end.is_some_and(|end| end < self.start)
    }
}

/// Add `delta` to every sibling whose position lies in `range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub range: PositionRange,
    pub delta: i32,
}

impl Shift {
    pub fn apply(&self, position: Position) -> Position {
        if self.range.contains(position) {
            position + self.delta
        } else {
            position
        }
    }
}

/// A sibling scope paired with a slot inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot<S> {
    pub scope: S,
    pub position: Position,
}

impl<S> Slot<S> {
    pub fn new(scope: S, position: Position) -> Self {
        Self { scope, position }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedShift<S> {
    pub scope: S,
    pub shift: Shift,
}

/// Renumbering for a move. The shifts run first (they exclude the moving
/// entity), then the entity is written at `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan<S> {
    pub shifts: Vec<ScopedShift<S>>,
    pub target: Slot<S>,
}

impl<S> MovePlan<S> {
    pub fn is_noop(&self) -> bool {
        self.shifts.is_empty()
    }
}

/// Slot for an entity appended to a scope holding `count` siblings.
pub fn append_position(count: usize) -> Position {
    count as Position
}

/// Closes the gap left when the entity at `position` leaves the scope
/// (delete, archive, or the origin side of a cross-scope move).
pub fn removal_shift(position: Position) -> Shift {
    Shift {
        range: PositionRange::after(position),
        delta: -1,
    }
}

/// Opens a slot at `position` for an incoming entity.
pub fn insertion_shift(position: Position) -> Shift {
    Shift {
        range: PositionRange::from(position),
        delta: 1,
    }
}

/// Plans a move between two slots, possibly in the same scope.
///
/// Within a scope, moving down decrements `(from, to]` and moving up
/// increments `[to, from)`. Across scopes, the origin closes its gap and the
/// destination opens one. A move onto its own slot plans nothing.
pub fn plan_move<S: Copy + PartialEq>(from: Slot<S>, to: Slot<S>) -> MovePlan<S> {
    let mut shifts = Vec::new();

    if from.scope == to.scope {
        if from.position < to.position {
            shifts.push(ScopedShift {
                scope: from.scope,
                shift: Shift {
                    range: PositionRange::between(from.position + 1, to.position),
                    delta: -1,
                },
            });
        } else if from.position > to.position {
            shifts.push(ScopedShift {
                scope: from.scope,
                shift: Shift {
                    range: PositionRange::between(to.position, from.position - 1),
                    delta: 1,
                },
            });
        }
    } else {
        shifts.push(ScopedShift {
            scope: from.scope,
            shift: removal_shift(from.position),
        });
        shifts.push(ScopedShift {
            scope: to.scope,
            shift: insertion_shift(to.position),
        });
    }

    MovePlan { shifts, target: to }
}

/// Clamps a requested destination to a slot that keeps the scope dense.
///
/// `sibling_count` counts the destination scope's entities, excluding the
/// moving one when it already lives there.
pub fn clamp_target(requested: Position, sibling_count: usize) -> Position {
    requested.clamp(0, append_position(sibling_count))
}

/// Assigns each id its index in `requested`.
///
/// The requested list must be a permutation of `current`: no missing ids,
/// no foreign ids, no duplicates. Anything else would leave stale positions
/// behind, so it is rejected.
pub fn plan_reorder<Id>(current: &[Id], requested: &[Id]) -> KanbanResult<Vec<(Id, Position)>>
where
    Id: Copy + Eq + Hash + Display,
{
    let existing: HashSet<Id> = current.iter().copied().collect();
    let mut seen = HashSet::with_capacity(requested.len());

    for id in requested {
        if !existing.contains(id) {
            return Err(KanbanError::Validation(format!(
                "Reorder references unknown id {}",
                id
            )));
        }
        if !seen.insert(*id) {
            return Err(KanbanError::Validation(format!(
                "Reorder lists id {} more than once",
                id
            )));
        }
    }
    if seen.len() != existing.len() {
        return Err(KanbanError::Validation(format!(
            "Reorder must list all {} entries, got {}",
            existing.len(),
            seen.len()
        )));
    }

    Ok(requested
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index as Position))
        .collect())
}

/// True when the positions are exactly `0..n` in any order.
pub fn is_dense(positions: impl IntoIterator<Item = Position>) -> bool {
    let mut positions: Vec<Position> = positions.into_iter().collect();
    positions.sort_unstable();
    positions
        .iter()
        .enumerate()
        .all(|(index, position)| *position == index as Position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Shifts every entry except the moving one.
    fn apply(entries: &mut [(char, Position)], shift: Shift, skip: char) {
        for (id, position) in entries.iter_mut() {
            if *id != skip {
                *position = shift.apply(*position);
            }
        }
    }

    fn ordered(entries: &[(char, Position)]) -> Vec<(char, Position)> {
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|(_, p)| *p);
        sorted
    }

    #[test]
    fn test_range_contains() {
        assert!(PositionRange::from(2).contains(2));
        assert!(PositionRange::from(2).contains(99));
        assert!(!PositionRange::from(2).contains(1));
        assert!(!PositionRange::after(2).contains(2));
        assert!(PositionRange::between(1, 3).contains(3));
        assert!(!PositionRange::between(1, 3).contains(4));
        assert!(PositionRange::between(3, 2).is_empty());
    }

    #[test]
    fn test_append_position() {
        assert_eq!(append_position(0), 0);
        assert_eq!(append_position(3), 3);
    }

    #[test]
    fn archive_second_card_closes_gap() {
        let mut cards = vec![('A', 0), ('B', 1), ('C', 2), ('D', 3)];
        apply(&mut cards, removal_shift(1), 'B');
        let active: Vec<_> = cards.iter().filter(|(id, _)| *id != 'B').copied().collect();
        assert_eq!(ordered(&active), vec![('A', 0), ('C', 1), ('D', 2)]);
        // archived card keeps its frozen slot
        assert_eq!(cards[1], ('B', 1));
    }

    #[test]
    fn move_down_within_column() {
        let mut cards = vec![('A', 0), ('B', 1), ('C', 2), ('D', 3)];
        let plan = plan_move(Slot::new(1u8, 0), Slot::new(1u8, 2));
        assert_eq!(plan.shifts.len(), 1);
        apply(&mut cards, plan.shifts[0].shift, 'A');
        cards[0].1 = plan.target.position;
        assert_eq!(
            ordered(&cards),
            vec![('B', 0), ('C', 1), ('A', 2), ('D', 3)]
        );
    }

    #[test]
    fn move_up_within_column() {
        let mut cards = vec![('A', 0), ('B', 1), ('C', 2), ('D', 3)];
        let plan = plan_move(Slot::new(1u8, 3), Slot::new(1u8, 1));
        apply(&mut cards, plan.shifts[0].shift, 'D');
        cards[3].1 = plan.target.position;
        assert_eq!(
            ordered(&cards),
            vec![('A', 0), ('D', 1), ('B', 2), ('C', 3)]
        );
    }

    #[test]
    fn move_onto_same_slot_is_noop() {
        let plan = plan_move(Slot::new(7u8, 2), Slot::new(7u8, 2));
        assert!(plan.is_noop());
        assert_eq!(plan.target, Slot::new(7u8, 2));
    }

    #[test]
    fn move_across_columns() {
        // X has four cards and the last one moves to the top of Y.
        let mut x = vec![('a', 0), ('b', 1), ('c', 2), ('d', 3)];
        let mut y = vec![('p', 0), ('q', 1)];
        let plan = plan_move(Slot::new('X', 3), Slot::new('Y', 0));
        assert_eq!(plan.shifts.len(), 2);

        for scoped in &plan.shifts {
            match scoped.scope {
                'X' => apply(&mut x, scoped.shift, 'd'),
                'Y' => apply(&mut y, scoped.shift, 'd'),
                _ => unreachable!(),
            }
        }
        x.retain(|(id, _)| *id != 'd');
        y.push(('d', plan.target.position));

        assert_eq!(ordered(&x), vec![('a', 0), ('b', 1), ('c', 2)]);
        assert_eq!(ordered(&y), vec![('d', 0), ('p', 1), ('q', 2)]);
    }

    #[test]
    fn reorder_assigns_indices() {
        let plan = plan_reorder(&[1, 2, 3], &[3, 1, 2]).unwrap();
        assert_eq!(plan, vec![(3, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn reorder_rejects_mismatched_sets() {
        assert!(matches!(
            plan_reorder(&[1, 2, 3], &[3, 1]),
            Err(KanbanError::Validation(_))
        ));
        assert!(matches!(
            plan_reorder(&[1, 2, 3], &[3, 1, 2, 4]),
            Err(KanbanError::Validation(_))
        ));
        assert!(matches!(
            plan_reorder(&[1, 2, 3], &[3, 3, 1]),
            Err(KanbanError::Validation(_))
        ));
    }

    #[test]
    fn test_clamp_target() {
        assert_eq!(clamp_target(10, 3), 3);
        assert_eq!(clamp_target(-4, 3), 0);
        assert_eq!(clamp_target(1, 3), 1);
        assert_eq!(clamp_target(5, 0), 0);
    }

    #[test]
    fn test_is_dense() {
        assert!(is_dense(Vec::new()));
        assert!(is_dense(vec![2, 0, 1]));
        assert!(!is_dense(vec![0, 2]));
        assert!(!is_dense(vec![0, 1, 1]));
        assert!(!is_dense(vec![1, 2]));
    }

    proptest! {
        #[test]
        fn prop_move_within_scope_stays_dense(len in 1usize..12, from in 0usize..12, to in 0usize..12) {
            let from = (from % len) as Position;
            let to = (to % len) as Position;
            let mut positions: Vec<Position> = (0..len as Position).collect();
            let plan = plan_move(Slot::new(0u8, from), Slot::new(0u8, to));
            for (index, position) in positions.iter_mut().enumerate() {
                if index as Position != from {
                    for scoped in &plan.shifts {
                        *position = scoped.shift.apply(*position);
                    }
                }
            }
            positions[from as usize] = plan.target.position;
            prop_assert!(is_dense(positions.iter().copied()));
            prop_assert_eq!(positions[from as usize], to);
        }

        #[test]
        fn prop_move_across_scopes_stays_dense(
            origin_len in 1usize..10,
            dest_len in 0usize..10,
            from in 0usize..10,
            to in 0usize..11,
        ) {
            let from = (from % origin_len) as Position;
            let to = clamp_target(to as Position, dest_len);
            let mut origin: Vec<Position> = (0..origin_len as Position).collect();
            let mut dest: Vec<Position> = (0..dest_len as Position).collect();
            let plan = plan_move(Slot::new(0u8, from), Slot::new(1u8, to));

            origin.remove(from as usize);
            for scoped in &plan.shifts {
                let scope = if scoped.scope == 0 { &mut origin } else { &mut dest };
                for position in scope.iter_mut() {
                    *position = scoped.shift.apply(*position);
                }
            }
            dest.push(plan.target.position);

            prop_assert!(is_dense(origin));
            prop_assert!(is_dense(dest));
        }
    }
}
