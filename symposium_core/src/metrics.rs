//! Per-philosopher counters and the end-of-run report.
//!
//! Philosophers record meals and completed waits as they happen; the driver
//! folds those counters together with fork utilization into one
//! serializable report when the run ends.

use crate::fork::{Fork, ForkUtilization};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone, Copy)]
struct Cell {
    meals: u64,
    waiting_ms: u64,
    longest_wait_ms: u64,
}

/// Shared meal/wait aggregation, one cell per philosopher.
pub struct MetricsCollector {
    cells: Mutex<Vec<Cell>>,
}

impl MetricsCollector {
    /// Creates zeroed counters for `count` philosophers.
    pub fn new(count: usize) -> Self {
        Self {
            cells: Mutex::new(vec![Cell::default(); count]),
        }
    }

    /// Banks one completed meal.
    pub fn record_meal(&self, philosopher: usize) {
        self.cells.lock().unwrap()[philosopher].meals += 1;
    }

    /// Banks one completed hungry wait.
    pub fn record_waiting(&self, philosopher: usize, waited_ms: u64) {
        let mut cells = self.cells.lock().unwrap();
        let cell = &mut cells[philosopher];
        cell.waiting_ms += waited_ms;
        cell.longest_wait_ms = cell.longest_wait_ms.max(waited_ms);
    }

    /// Meals banked so far for one philosopher.
    pub fn meals(&self, philosopher: usize) -> u64 {
        self.cells.lock().unwrap()[philosopher].meals
    }

    /// Total completed wait time so far for one philosopher.
    pub fn waiting_ms(&self, philosopher: usize) -> u64 {
        self.cells.lock().unwrap()[philosopher].waiting_ms
    }

    /// Folds the counters and fork time buckets into the final report.
    /// `total_ms` is the run length the utilization percentages are taken
    /// against.
    pub fn report(&self, names: &[String], forks: &[Arc<Fork>], total_ms: u64) -> MetricsReport {
        let cells = self.cells.lock().unwrap();
        let philosophers: Vec<PhilosopherReport> = cells
            .iter()
            .enumerate()
            .map(|(id, cell)| {
                let name = names
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| format!("Philosopher-{id}"));
                let avg_wait_ms = if cell.meals > 0 {
                    cell.waiting_ms as f64 / cell.meals as f64
                } else {
                    0.0
                };
                let throughput_per_1k = if total_ms > 0 {
                    cell.meals as f64 * 1000.0 / total_ms as f64
                } else {
                    0.0
                };
                PhilosopherReport {
                    id,
                    name,
                    meals: cell.meals,
                    waiting_ms: cell.waiting_ms,
                    longest_wait_ms: cell.longest_wait_ms,
                    avg_wait_ms,
                    throughput_per_1k,
                }
            })
            .collect();

        MetricsReport {
            total_meals: philosophers.iter().map(|p| p.meals).sum(),
            philosophers,
            forks: forks.iter().map(|fork| fork.utilization(total_ms)).collect(),
        }
    }
}

/// Final per-philosopher line of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhilosopherReport {
    /// Seat index.
    pub id: usize,
    /// Display name.
    pub name: String,
    /// Completed meals.
    pub meals: u64,
    /// Total completed wait time.
    pub waiting_ms: u64,
    /// Longest single wait.
    pub longest_wait_ms: u64,
    /// Mean wait per meal; zero when no meal completed.
    pub avg_wait_ms: f64,
    /// Meals per thousand time units of run length.
    pub throughput_per_1k: f64,
}

/// End-of-run aggregation over the whole table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Meals completed by everyone combined.
    pub total_meals: u64,
    /// One line per philosopher, in seat order.
    pub philosophers: Vec<PhilosopherReport>,
    /// Time-bucket percentages per fork.
    pub forks: Vec<ForkUtilization>,
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total meals: {}", self.total_meals)?;
        for p in &self.philosophers {
            writeln!(
                f,
                "  [{:>2}] {:<12} meals {:>5}  waited {:>8} ms  avg {:>8.1} ms  longest {:>6} ms  {:>6.2} meals/1k",
                p.id, p.name, p.meals, p.waiting_ms, p.avg_wait_ms, p.longest_wait_ms, p.throughput_per_1k,
            )?;
        }
        writeln!(f, "fork usage:")?;
        for u in &self.forks {
            writeln!(
                f,
                "  [{:>2}] free {:>5.1}%  blocked {:>5.1}%  eating {:>5.1}%",
                u.fork, u.free_pct, u.blocked_pct, u.eating_pct,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::VirtualClock;

    #[test]
    fn test_counters_accumulate_per_philosopher() {
        let metrics = MetricsCollector::new(3);
        metrics.record_meal(0);
        metrics.record_meal(0);
        metrics.record_meal(2);
        metrics.record_waiting(0, 10);
        metrics.record_waiting(0, 25);
        metrics.record_waiting(1, 40);

        assert_eq!(metrics.meals(0), 2);
        assert_eq!(metrics.meals(1), 0);
        assert_eq!(metrics.meals(2), 1);
        assert_eq!(metrics.waiting_ms(0), 35);
        assert_eq!(metrics.waiting_ms(1), 40);
    }

    #[test]
    fn test_report_math_and_guards() {
        let metrics = MetricsCollector::new(2);
        metrics.record_meal(0);
        metrics.record_meal(0);
        metrics.record_waiting(0, 30);
        metrics.record_waiting(0, 50);

        let names = vec!["Aristotle".to_string(), "Plato".to_string()];
        let clock = Arc::new(VirtualClock::new());
        let forks = vec![Arc::new(Fork::new(0, clock))];
        let report = metrics.report(&names, &forks, 1000);

        assert_eq!(report.total_meals, 2);
        let first = &report.philosophers[0];
        assert_eq!(first.longest_wait_ms, 50);
        assert!((first.avg_wait_ms - 40.0).abs() < f64::EPSILON);
        assert!((first.throughput_per_1k - 2.0).abs() < f64::EPSILON);

        // No meals: averages stay at zero instead of dividing by zero.
        let second = &report.philosophers[1];
        assert_eq!(second.meals, 0);
        assert_eq!(second.avg_wait_ms, 0.0);

        // Zero-length run: throughput is defined as zero.
        let empty = metrics.report(&names, &forks, 0);
        assert_eq!(empty.philosophers[0].throughput_per_1k, 0.0);
    }

    #[test]
    fn test_display_lists_every_philosopher_and_fork() {
        let metrics = MetricsCollector::new(2);
        metrics.record_meal(1);
        let names = vec!["Aristotle".to_string(), "Plato".to_string()];
        let clock = Arc::new(VirtualClock::new());
        let forks = vec![
            Arc::new(Fork::new(0, clock.clone())),
            Arc::new(Fork::new(1, clock)),
        ];

        let rendered = metrics.report(&names, &forks, 500).to_string();
        assert!(rendered.contains("total meals: 1"));
        assert!(rendered.contains("Aristotle"));
        assert!(rendered.contains("Plato"));
        assert!(rendered.contains("fork usage:"));
    }
}
