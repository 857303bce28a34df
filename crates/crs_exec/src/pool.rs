//! A bounded worker pool over a shared work list, mirroring a mutex-guarded
//! shared-iterator design: each worker takes one item at a time and the
//! first failure stops handing out new work, without aborting in-flight
//! items.

use parking_lot::Mutex;

use crate::error::BuildError;

fn default_job_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1) + 2
}

/// Runs `f` over every item in `items`, using up to `jobs` worker threads
/// (or a hardware-derived default when `jobs == 0`). Every failure `f`
/// returns is collected; once any failure has been recorded, workers stop
/// picking up new items but let in-flight work finish.
pub fn parallel_run<T, F>(items: Vec<T>, jobs: usize, f: F) -> Result<(), Vec<BuildError>>
where
    T: Send,
    F: Fn(&T) -> Result<(), BuildError> + Sync,
{
    if items.is_empty() {
        return Ok(());
    }
    let jobs = if jobs == 0 { default_job_count() } else { jobs }.min(items.len());

    let queue = Mutex::new(items.into_iter());
    let errors: Mutex<Vec<BuildError>> = Mutex::new(Vec::new());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .expect("failed to build worker thread pool");

    pool.scope(|scope| {
        for _ in 0..jobs {
            scope.spawn(|_| loop {
                if !errors.lock().is_empty() {
                    break;
                }
                let item = queue.lock().next();
                let Some(item) = item else { break };
                if let Err(e) = f(&item) {
                    tracing::error!(error = %e, "build step failed");
                    errors.lock().push(e);
                    break;
                }
            });
        }
    });

    let errors = errors.into_inner();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn runs_every_item_when_nothing_fails() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let items: Vec<i32> = (0..20).collect();
        let seen2 = seen.clone();
        let result = parallel_run(items, 4, move |i| {
            seen2.lock().push(*i);
            Ok(())
        });
        assert!(result.is_ok());
        let mut seen = seen.lock().clone();
        seen.sort();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn a_failure_is_surfaced_and_does_not_panic_the_pool() {
        let items: Vec<i32> = (0..20).collect();
        let result = parallel_run(items, 4, |i| {
            if *i == 7 {
                Err(BuildError::MissingDepsFile(std::path::PathBuf::from("x")))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_empty());
    }

    #[test]
    fn a_failure_at_item_seven_of_one_hundred_still_processes_at_most_ninety_nine() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let items: Vec<i32> = (1..=100).collect();
        let seen2 = seen.clone();
        let result = parallel_run(items, 4, move |i| {
            if *i == 7 {
                return Err(BuildError::MissingDepsFile(std::path::PathBuf::from("x")));
            }
            seen2.lock().push(*i);
            Ok(())
        });
        assert!(result.is_err());
        assert!(seen.lock().len() <= 99);
    }

    #[test]
    fn empty_input_succeeds_trivially() {
        let result: Result<(), Vec<BuildError>> = parallel_run(Vec::<i32>::new(), 4, |_| Ok(()));
        assert!(result.is_ok());
    }
}
