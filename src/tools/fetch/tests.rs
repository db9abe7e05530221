#[cfg(test)]
mod tests {
    use crate::tools::fetch::{
        race, race_with_cancel, AttemptContext, FailureCause, FetchStrategy, Mode, RaceOptions,
        RaceOutcome, StrategyError, StrategySet, Target,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn page(marker: &str) -> String {
        format!("<html><body><p>{marker}</p></body></html>")
    }

    #[derive(Clone)]
    enum Reply {
        Content(String),
        Fail,
        Empty,
        Unavailable,
        Panic,
        Hang,
    }

    /// Tracks how many mock attempts are running at once.
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    struct GaugeGuard<'a>(&'a Gauge);

    impl Drop for GaugeGuard<'_> {
        fn drop(&mut self) {
            self.0.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl Gauge {
        fn enter(&self) -> GaugeGuard<'_> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            GaugeGuard(self)
        }
    }

    struct Mock {
        name: String,
        delay: Duration,
        reply: Reply,
        calls: AtomicUsize,
        completed: AtomicUsize,
        gauge: Arc<Gauge>,
        user_agents: Mutex<Vec<&'static str>>,
    }

    impl Mock {
        fn new(name: &str, delay_ms: u64, reply: Reply) -> Arc<Self> {
            Self::gauged(name, delay_ms, reply, Arc::new(Gauge::default()))
        }

        fn gauged(name: &str, delay_ms: u64, reply: Reply, gauge: Arc<Gauge>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                delay: Duration::from_millis(delay_ms),
                reply,
                calls: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                gauge,
                user_agents: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FetchStrategy for Mock {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(
            &self,
            _target: &Target,
            ctx: &mut AttemptContext,
        ) -> Result<String, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.user_agents.lock().unwrap().push(ctx.user_agent);
            let _active = self.gauge.enter();
            tokio::time::sleep(self.delay).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Content(body) => Ok(body.clone()),
                Reply::Fail => Err(StrategyError::transport(format!("{} refused", self.name))),
                Reply::Empty => Ok("   ".into()),
                Reply::Unavailable => Err(StrategyError::unavailable("not installed")),
                Reply::Panic => panic!("{} blew up", self.name),
                Reply::Hang => std::future::pending().await,
            }
        }
    }

    fn set(mocks: &[Arc<Mock>]) -> StrategySet {
        mocks
            .iter()
            .map(|m| Arc::clone(m) as Arc<dyn FetchStrategy>)
            .collect()
    }

    fn options(mode: Mode, max_retries: u32) -> RaceOptions {
        RaceOptions {
            max_retries,
            base_delay: Duration::from_millis(10),
            concurrency_cap: 8,
            mode,
            attempt_timeout: Duration::from_secs(30),
            max_jitter: Duration::ZERO,
            pacing: None,
            seed: Some(11),
            ..RaceOptions::default()
        }
    }

    fn target() -> Target {
        Target::parse("https://example.com/page").unwrap()
    }

    fn causes(outcome: &RaceOutcome) -> Vec<(String, FailureCause)> {
        outcome
            .failures()
            .iter()
            .map(|f| (f.strategy.clone(), f.cause.clone()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn fast_valid_strategy_wins() {
        let failing = Mock::new("failing", 5, Reply::Fail);
        let fast = Mock::new("fast", 20, Reply::Content(page("fast")));
        let slow = Mock::new("slow", 5_000, Reply::Content(page("slow")));

        let outcome = race(&target(), &set(&[failing, fast, slow.clone()]), &options(Mode::Concurrent, 2)).await;

        assert_eq!(outcome.winner(), Some("fast"));
        assert_eq!(outcome.content(), Some(page("fast").as_str()));
        assert!(outcome.failures().is_empty());
        assert_eq!(slow.completed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_valid_result_never_replaces_winner() {
        let fast = Mock::new("fast", 10, Reply::Content(page("fast")));
        let slow = Mock::new("slow", 1_000, Reply::Content(page("slow")));

        let outcome = race(&target(), &set(&[slow.clone(), fast]), &options(Mode::Concurrent, 0)).await;
        assert_eq!(outcome.winner(), Some("fast"));

        // Give the loser far more time than it needs; it was aborted.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(slow.calls(), 1);
        assert_eq!(slow.completed(), 0);
        assert_eq!(outcome.winner(), Some("fast"));
    }

    #[tokio::test(start_paused = true)]
    async fn all_failing_strategies_exhaust_with_one_entry_each() {
        let mocks: Vec<_> = (0..5)
            .map(|i| Mock::new(&format!("s{i}"), 10 * i, Reply::Fail))
            .collect();

        let outcome = race(&target(), &set(&mocks), &options(Mode::Concurrent, 2)).await;

        assert!(!outcome.is_won());
        let expected: Vec<_> = (0..5)
            .map(|i| {
                (
                    format!("s{i}"),
                    FailureCause::Transport(format!("s{i} refused")),
                )
            })
            .collect();
        assert_eq!(causes(&outcome), expected);
        assert_eq!(outcome.error_count(), 5);
        assert!(mocks.iter().all(|m| m.calls() == 3));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_cap_bounds_active_strategies() {
        let gauge = Arc::new(Gauge::default());
        let mocks: Vec<_> = (0..13)
            .map(|i| Mock::gauged(&format!("s{i}"), 100, Reply::Fail, Arc::clone(&gauge)))
            .collect();

        let outcome = race(&target(), &set(&mocks), &options(Mode::Concurrent, 1)).await;

        assert_eq!(outcome.failures().len(), 13);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 8);
        assert_eq!(gauge.current.load(Ordering::SeqCst), 0);
        assert!(mocks.iter().all(|m| m.calls() == 2));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_content_is_rejected_and_race_continues() {
        let stub = Mock::new("stub", 5, Reply::Content("Access denied".into()));
        let good = Mock::new("good", 50, Reply::Content(page("good")));

        let outcome = race(&target(), &set(&[stub.clone(), good]), &options(Mode::Concurrent, 3)).await;

        assert_eq!(outcome.winner(), Some("good"));
        // Rejection is final for the strategy, not a reason to retry.
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_and_empty_results_are_distinct_causes() {
        let stub = Mock::new("stub", 5, Reply::Content("Access denied".into()));
        let empty = Mock::new("empty", 5, Reply::Empty);

        let outcome = race(&target(), &set(&[stub, empty.clone()]), &options(Mode::Concurrent, 1)).await;

        assert_eq!(
            causes(&outcome),
            vec![
                (
                    "stub".to_string(),
                    FailureCause::Rejected {
                        chars: 13,
                        reason: "too short".into()
                    }
                ),
                (
                    "empty".to_string(),
                    FailureCause::Transport("returned no content".into())
                ),
            ]
        );
        // Empty content is retried like any transport failure.
        assert_eq!(empty.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_strategy_is_contained() {
        let bomb = Mock::new("bomb", 1, Reply::Panic);
        let good = Mock::new("good", 30, Reply::Content(page("good")));

        let outcome = race(&target(), &set(&[bomb.clone(), good]), &options(Mode::Concurrent, 0)).await;
        assert_eq!(outcome.winner(), Some("good"));

        let outcome = race(&target(), &set(&[bomb]), &options(Mode::Concurrent, 0)).await;
        assert_eq!(
            causes(&outcome),
            vec![(
                "bomb".to_string(),
                FailureCause::Panicked("bomb blew up".into())
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_strategies_are_skipped_not_errors() {
        let missing = Mock::new("missing", 0, Reply::Unavailable);
        let failing = Mock::new("failing", 0, Reply::Fail);

        let outcome = race(&target(), &set(&[missing.clone(), failing]), &options(Mode::Concurrent, 2)).await;

        assert_eq!(outcome.failures().len(), 2);
        assert_eq!(outcome.error_count(), 1);
        assert_eq!(missing.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_ends_race() {
        let a = Mock::new("a", 0, Reply::Hang);
        let b = Mock::new("b", 0, Reply::Hang);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let outcome = race_with_cancel(&target(), &set(&[a, b]), &options(Mode::Concurrent, 0), &cancel).await;

        assert_eq!(
            causes(&outcome),
            vec![
                ("a".to_string(), FailureCause::Cancelled),
                ("b".to_string(), FailureCause::Cancelled),
            ]
        );
        assert_eq!(outcome.error_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_concurrency_cap_runs_like_unbounded() {
        let gauge = Arc::new(Gauge::default());
        let mocks: Vec<_> = (0..3)
            .map(|i| Mock::gauged(&format!("s{i}"), 100, Reply::Fail, Arc::clone(&gauge)))
            .collect();
        let opts = RaceOptions {
            concurrency_cap: usize::MAX,
            ..options(Mode::Concurrent, 0)
        };

        let outcome = race(&target(), &set(&mocks), &opts).await;
        assert_eq!(outcome.failures().len(), 3);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 3);

        let good = Mock::new("good", 10, Reply::Content(page("good")));
        let outcome = race(&target(), &set(&[good]), &opts).await;
        assert_eq!(outcome.winner(), Some("good"));

        let outcome = race(&target(), &StrategySet::default(), &opts).await;
        assert!(outcome.failures().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn parent_cancellation_ends_sequential_run() {
        let a = Mock::new("a", 0, Reply::Hang);
        let b = Mock::new("b", 0, Reply::Hang);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let outcome = race_with_cancel(
            &target(),
            &set(&[a.clone(), b.clone()]),
            &options(Mode::Sequential, 2),
            &cancel,
        )
        .await;

        assert_eq!(
            causes(&outcome),
            vec![
                ("a".to_string(), FailureCause::Cancelled),
                ("b".to_string(), FailureCause::Cancelled),
            ]
        );
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn empty_set_is_exhausted() {
        for mode in [Mode::Concurrent, Mode::Sequential] {
            let outcome = race(&target(), &StrategySet::default(), &options(mode, 0)).await;
            assert!(!outcome.is_won());
            assert!(outcome.failures().is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_stops_at_first_valid() {
        let failing = Mock::new("failing", 5, Reply::Fail);
        let stub = Mock::new("stub", 5, Reply::Content("tiny".into()));
        let good = Mock::new("good", 5, Reply::Content(page("good")));
        let never = Mock::new("never", 5, Reply::Content(page("never")));

        let outcome = race(
            &target(),
            &set(&[failing.clone(), stub, good, never.clone()]),
            &options(Mode::Sequential, 1),
        )
        .await;

        assert_eq!(outcome.winner(), Some("good"));
        assert_eq!(failing.calls(), 2);
        assert_eq!(never.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_exhaustion_keeps_encounter_order() {
        let gauge = Arc::new(Gauge::default());
        let a = Mock::gauged("a", 5, Reply::Fail, Arc::clone(&gauge));
        let b = Mock::gauged("b", 5, Reply::Unavailable, Arc::clone(&gauge));
        let c = Mock::gauged("c", 5, Reply::Content("short".into()), Arc::clone(&gauge));

        let outcome = race(&target(), &set(&[a, b, c]), &options(Mode::Sequential, 0)).await;

        let names: Vec<_> = causes(&outcome).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(matches!(
            outcome.failures()[2].cause,
            FailureCause::Rejected { .. }
        ));
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn same_seed_rotates_user_agents_identically() {
        let first = Mock::new("flaky", 0, Reply::Fail);
        let second = Mock::new("flaky", 0, Reply::Fail);

        race(&target(), &set(&[first.clone()]), &options(Mode::Sequential, 3)).await;
        race(&target(), &set(&[second.clone()]), &options(Mode::Sequential, 3)).await;

        let a = first.user_agents.lock().unwrap().clone();
        let b = second.user_agents.lock().unwrap().clone();
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_winner_among_many_valid() {
        let mocks: Vec<_> = (0..10)
            .map(|i| Mock::new(&format!("v{i}"), 10, Reply::Content(page(&format!("v{i}")))))
            .collect();

        let outcome = race(&target(), &set(&mocks), &options(Mode::Concurrent, 0)).await;

        let winner = outcome.winner().expect("race should be won").to_string();
        assert!(mocks.iter().any(|m| m.name == winner));
        assert_eq!(outcome.content(), Some(page(&winner).as_str()));
    }
}
