//! Terminal rendering of table snapshots and finished runs.

use crate::outcome::RunOutcome;
use std::fmt::Write;
use symposium_core::{ForkState, ForkView, PhilosopherState, PhilosopherView};

fn state_label(state: PhilosopherState) -> &'static str {
    match state {
        PhilosopherState::Thinking => "thinking",
        PhilosopherState::Hungry => "hungry",
        PhilosopherState::Eating => "eating",
    }
}

/// One aligned line per philosopher, then one per fork.
pub fn render_table(philosophers: &[PhilosopherView], forks: &[ForkView]) -> String {
    let mut out = String::new();
    for p in philosophers {
        let left = if p.has_left { 'L' } else { '-' };
        let right = if p.has_right { 'R' } else { '-' };
        let _ = writeln!(
            out,
            "  [{:>2}] {:<12} {:<8} [{left}{right}] meals {:>4}  last {:?}",
            p.id,
            p.name,
            state_label(p.state),
            p.eaten_count,
            p.action,
        );
    }
    let _ = writeln!(out, "forks:");
    for fork in forks {
        match (fork.state, fork.owner) {
            (ForkState::InUse, Some(owner)) => {
                let _ = writeln!(out, "  [{:>2}] held by philosopher {owner}", fork.id);
            }
            _ => {
                let _ = writeln!(out, "  [{:>2}] free", fork.id);
            }
        }
    }
    out
}

/// Outcome header plus the metrics block.
pub fn render_outcome(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{outcome}");
    let _ = write!(out, "{}", outcome.report);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use symposium_core::Action;

    #[test]
    fn test_render_shows_holds_and_fork_owners() {
        let philosophers = vec![PhilosopherView {
            id: 0,
            name: "Aristotle".to_string(),
            state: PhilosopherState::Hungry,
            has_left: true,
            has_right: false,
            eaten_count: 2,
            action: Action::TakeRight,
        }];
        let forks = vec![
            ForkView {
                id: 0,
                state: ForkState::InUse,
                owner: Some(0),
            },
            ForkView {
                id: 1,
                state: ForkState::Available,
                owner: None,
            },
        ];

        let rendered = render_table(&philosophers, &forks);
        assert!(rendered.contains("Aristotle"));
        assert!(rendered.contains("hungry"));
        assert!(rendered.contains("[L-]"));
        assert!(rendered.contains("held by philosopher 0"));
        assert!(rendered.contains("free"));
    }
}
