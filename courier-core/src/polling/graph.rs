use std::fmt::Debug;

/// `StateGraph` describes a protocol state machine that can only move forward
///
/// - `successor` is the next state on the happy path, `None` for the last one or when the
///   next state can only be reached through an explicit local operation
/// - `rank` orders the happy path, a state with a lower rank than the current one is an old state
/// - a failure state can be reached from any state which is not terminal
pub trait StateGraph: Copy + PartialEq + Debug {
    fn successor(&self) -> Option<Self>;
    fn rank(&self) -> u8;
    fn is_terminal(&self) -> bool;
    fn is_failure(&self) -> bool;

    fn can_transition(&self, next: &Self) -> bool {
        if self.is_terminal() {
            return false;
        }

        next.is_failure() || self.successor().as_ref() == Some(next)
    }
}

/// `plan_transitions` returns every intermediate state needed to move from `current` to
/// the `observed` remote state, in order, including `observed` itself
///
/// An empty plan means there is nothing to apply: the local state is terminal, or the remote
/// state is the same, older, or cannot be reached by walking the graph forward.
pub fn plan_transitions<TState>(current: TState, observed: TState) -> Vec<TState>
where
    TState: StateGraph,
{
    if current.is_terminal() || current == observed {
        return vec![];
    }

    if observed.is_failure() {
        return vec![observed];
    }

    if observed.rank() <= current.rank() {
        return vec![];
    }

    let mut steps = vec![];
    let mut cursor = current;
    while let Some(next) = cursor.successor() {
        steps.push(next);
        if next == observed {
            return steps;
        }

        cursor = next;
    }

    vec![]
}
