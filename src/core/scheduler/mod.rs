//! Cooperative task scheduler
//!
//! Owns every cooperative task and advances them once per external tick with
//! the elapsed wall-clock time the host reports. Tasks resume in registration
//! order; a task with an interval only resumes once its accumulated elapsed
//! time has crossed the interval, after which the accumulator resets to zero
//! (time below the threshold carries forward, drift is not compensated —
//! see `test_interval_accumulator_resets_to_zero_by_policy`).
//!
//! Failure containment: a step error is logged and the task is left in place
//! to be retried on its next qualifying tick. A single bad tick never kills a
//! job.
//!
//! # Components
//!
//! - [`task`]: The [`TaskRoutine`] seam and closure adapters
//! - [`promise`]: Single-resolution futures driven by one-shot tasks

pub mod promise;
pub mod task;

pub use promise::{Promise, Resolver};
pub use task::{CallbackRoutine, FnRoutine, StepResult, TaskRoutine, TimeoutRoutine};

use std::time::Duration;

/// Opaque handle to a scheduled task.
///
/// Handles stay valid after the task completes; operations on a completed
/// task's id are no-ops, so callers may hold stale ids safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

struct TaskEntry<C> {
    id: TaskId,
    routine: Box<dyn TaskRoutine<C>>,
    interval: Duration,
    accumulated: Duration,
    paused: bool,
    once: bool,
    finished: bool,
    on_done: Vec<Box<dyn FnMut(&mut C)>>,
}

/// The scheduler: an ordered set of cooperative tasks over a context `C`.
///
/// Single-threaded by contract — the host drives [`Scheduler::tick`] and
/// nothing here blocks or spawns threads.
pub struct Scheduler<C> {
    tasks: Vec<TaskEntry<C>>,
    next_id: u64,
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a new task bound to `routine`.
    ///
    /// Defaults: zero interval (resumes every tick), repeating (the routine
    /// is restarted when its sequence exhausts), not paused. Returns a
    /// builder for chained configuration:
    ///
    /// ```
    /// use std::time::Duration;
    /// use ore_trail::core::scheduler::{Scheduler, CallbackRoutine};
    ///
    /// let mut sched: Scheduler<u32> = Scheduler::new();
    /// let id = sched
    ///     .run_task(CallbackRoutine::new(|count: &mut u32| *count += 1))
    ///     .every(Duration::from_millis(500))
    ///     .id();
    /// assert!(sched.is_running(id));
    /// ```
    pub fn run_task(&mut self, routine: impl TaskRoutine<C> + 'static) -> Spawned<'_, C> {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(TaskEntry {
            id,
            routine: Box::new(routine),
            interval: Duration::ZERO,
            accumulated: Duration::ZERO,
            paused: false,
            once: false,
            finished: false,
            on_done: Vec::new(),
        });
        Spawned { scheduler: self, id }
    }

    /// Run `cb` every `interval` until the task is stopped.
    pub fn set_interval(
        &mut self,
        interval: Duration,
        cb: impl FnMut(&mut C) + 'static,
    ) -> TaskId
    where
        C: 'static,
    {
        self.run_task(CallbackRoutine::new(cb)).every(interval).id()
    }

    /// Run `cb` once after `delay`.
    pub fn set_timeout(&mut self, delay: Duration, cb: impl FnOnce(&mut C) + 'static) -> TaskId
    where
        C: 'static,
    {
        self.run_task(TimeoutRoutine::new(cb))
            .once()
            .every(delay)
            .id()
    }

    /// Set the minimum re-entry period for a task.
    pub fn every(&mut self, id: TaskId, interval: Duration) {
        if let Some(task) = self.entry_mut(id) {
            task.interval = interval;
        }
    }

    /// Mark a task one-shot: it is removed (and its completion callbacks
    /// fire) the first time its routine reports exhaustion.
    pub fn once(&mut self, id: TaskId) {
        if let Some(task) = self.entry_mut(id) {
            task.once = true;
        }
    }

    /// Suspend or resume a task without touching its iteration state.
    ///
    /// A paused task accumulates no elapsed time.
    pub fn pause(&mut self, id: TaskId, paused: bool) {
        if let Some(task) = self.entry_mut(id) {
            task.paused = paused;
        }
    }

    /// Register a completion callback.
    ///
    /// Fires on natural exhaustion of a one-shot task and on [`Scheduler::stop_task`]
    /// alike — callers cannot distinguish cancellation from completion through
    /// this channel.
    pub fn on_done(&mut self, id: TaskId, cb: impl FnMut(&mut C) + 'static) {
        if let Some(task) = self.entry_mut(id) {
            task.on_done.push(Box::new(cb));
        }
    }

    /// Remove a task immediately, firing its completion callbacks.
    ///
    /// Returns `false` if the task was not registered (already completed or
    /// stopped), in which case nothing fires.
    pub fn stop_task(&mut self, id: TaskId, ctx: &mut C) -> bool {
        match self.tasks.iter().position(|t| t.id == id) {
            Some(index) => {
                let mut entry = self.tasks.remove(index);
                for cb in entry.on_done.iter_mut() {
                    cb(ctx);
                }
                true
            }
            None => false,
        }
    }

    /// Whether the task is registered and not paused.
    pub fn is_running(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id && !t.paused)
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Advance every non-paused task whose accumulated time has crossed its
    /// interval, resuming each at most once.
    ///
    /// Repeating tasks whose sequence exhausts are restarted from the
    /// beginning (resuming on their next qualifying tick); one-shot tasks are
    /// removed and their completion callbacks fire. Step errors are logged
    /// and the task is retried next qualifying tick.
    pub fn tick(&mut self, ctx: &mut C, elapsed: Duration) {
        for task in self.tasks.iter_mut() {
            if task.paused {
                continue;
            }

            task.accumulated += elapsed;
            if task.accumulated < task.interval {
                continue;
            }

            let dt = task.accumulated;
            // Reset-to-zero policy: time past the interval is discarded, so
            // frequency degrades under host ticks longer than the interval.
            task.accumulated = Duration::ZERO;

            match task.routine.step(ctx, dt) {
                Ok(StepResult::Continue) => {}
                Ok(StepResult::Done) => {
                    if task.once {
                        task.finished = true;
                    } else {
                        task.routine.restart();
                    }
                }
                Err(e) => {
                    log::warn!("task {:?} step failed: {}", task.id, e);
                }
            }
        }

        // Sweep exhausted one-shot tasks, firing their callbacks.
        let mut index = 0;
        while index < self.tasks.len() {
            if self.tasks[index].finished {
                let mut entry = self.tasks.remove(index);
                for cb in entry.on_done.iter_mut() {
                    cb(ctx);
                }
            } else {
                index += 1;
            }
        }
    }

    fn entry_mut(&mut self, id: TaskId) -> Option<&mut TaskEntry<C>> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder returned by [`Scheduler::run_task`] for chained configuration.
pub struct Spawned<'a, C> {
    scheduler: &'a mut Scheduler<C>,
    id: TaskId,
}

impl<'a, C> Spawned<'a, C> {
    pub fn every(self, interval: Duration) -> Self {
        self.scheduler.every(self.id, interval);
        self
    }

    pub fn once(self) -> Self {
        self.scheduler.once(self.id);
        self
    }

    pub fn on_done(self, cb: impl FnMut(&mut C) + 'static) -> Self {
        self.scheduler.on_done(self.id, cb);
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Unit test context: a plain counter plus an event log.
    #[derive(Default)]
    struct Ctx {
        steps: u32,
        events: Vec<&'static str>,
    }

    /// Routine yielding `total` times before exhausting.
    struct CountedRoutine {
        remaining: u32,
        total: u32,
    }

    impl CountedRoutine {
        fn new(total: u32) -> Self {
            Self {
                remaining: total,
                total,
            }
        }
    }

    impl TaskRoutine<Ctx> for CountedRoutine {
        fn step(&mut self, ctx: &mut Ctx, _dt: Duration) -> Result<StepResult, &'static str> {
            if self.remaining == 0 {
                return Ok(StepResult::Done);
            }
            self.remaining -= 1;
            ctx.steps += 1;
            Ok(StepResult::Continue)
        }

        fn restart(&mut self) {
            self.remaining = self.total;
        }
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_zero_interval_task_runs_every_tick() {
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        sched.run_task(CallbackRoutine::new(|c: &mut Ctx| c.steps += 1));

        for _ in 0..5 {
            sched.tick(&mut ctx, ms(100));
        }
        assert_eq!(ctx.steps, 5);
    }

    #[test]
    fn test_set_interval_runs_at_period() {
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        sched.set_interval(ms(250), |c: &mut Ctx| c.steps += 1);

        for _ in 0..10 {
            sched.tick(&mut ctx, ms(100));
        }
        // Qualifying ticks at 300, 600(acc 300), 900(acc 300) ... within
        // 1000ms of 100ms ticks: t3, t6, t9.
        assert_eq!(ctx.steps, 3);
    }

    #[test]
    fn test_interval_gates_resumption() {
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        sched
            .run_task(CallbackRoutine::new(|c: &mut Ctx| c.steps += 1))
            .every(ms(1000));

        // Total elapsed below the interval: never resumed.
        for _ in 0..9 {
            sched.tick(&mut ctx, ms(100));
        }
        assert_eq!(ctx.steps, 0);

        // The tick that crosses the interval resumes exactly once.
        sched.tick(&mut ctx, ms(100));
        assert_eq!(ctx.steps, 1);

        // Accumulator was reset: the next tick does not resume again.
        sched.tick(&mut ctx, ms(100));
        assert_eq!(ctx.steps, 1);
    }

    #[test]
    fn test_interval_accumulator_resets_to_zero_by_policy() {
        // Deliberate configuration choice (see module docs): after a
        // qualifying resume the accumulator resets to zero rather than
        // subtracting the interval, so a single long host tick yields one
        // resume, not elapsed/interval resumes, and the surplus is discarded.
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        sched
            .run_task(CallbackRoutine::new(|c: &mut Ctx| c.steps += 1))
            .every(ms(100));

        sched.tick(&mut ctx, ms(350));
        assert_eq!(ctx.steps, 1);

        // Under the subtract-interval alternative this tick would resume
        // immediately (250ms of credit); under reset-to-zero it must wait a
        // full interval again.
        sched.tick(&mut ctx, ms(50));
        assert_eq!(ctx.steps, 1);
        sched.tick(&mut ctx, ms(50));
        assert_eq!(ctx.steps, 2);
    }

    #[test]
    fn test_dt_carries_accumulated_time() {
        let mut sched = Scheduler::new();
        let seen: Rc<RefCell<Vec<Duration>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_in = Rc::clone(&seen);
        let mut ctx = Ctx::default();
        sched
            .run_task(FnRoutine::new(move |_c: &mut Ctx, dt: Duration| {
                seen_in.borrow_mut().push(dt);
                Ok(StepResult::Continue)
            }))
            .every(ms(300));

        sched.tick(&mut ctx, ms(200));
        sched.tick(&mut ctx, ms(200));
        assert_eq!(seen.borrow().as_slice(), &[ms(400)]);
    }

    #[test]
    fn test_paused_task_accumulates_nothing() {
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        let id = sched
            .run_task(CallbackRoutine::new(|c: &mut Ctx| c.steps += 1))
            .every(ms(100))
            .id();

        sched.pause(id, true);
        assert!(!sched.is_running(id));
        for _ in 0..10 {
            sched.tick(&mut ctx, ms(100));
        }
        assert_eq!(ctx.steps, 0);

        // Unpausing preserves the task; it starts accumulating from zero.
        sched.pause(id, false);
        sched.tick(&mut ctx, ms(100));
        assert_eq!(ctx.steps, 1);
    }

    #[test]
    fn test_repeating_task_restarts_after_exhaustion() {
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        sched.run_task(CountedRoutine::new(2));

        // Two productive steps, one exhaustion step (restart), two more.
        for _ in 0..5 {
            sched.tick(&mut ctx, ms(100));
        }
        assert_eq!(ctx.steps, 4);
    }

    #[test]
    fn test_once_task_removed_and_callbacks_fire() {
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        let id = sched
            .run_task(CountedRoutine::new(1))
            .once()
            .on_done(|c: &mut Ctx| c.events.push("done"))
            .id();

        sched.tick(&mut ctx, ms(100)); // productive step
        assert!(sched.is_running(id));
        sched.tick(&mut ctx, ms(100)); // exhaustion step
        assert!(!sched.is_running(id));
        assert_eq!(ctx.events, vec!["done"]);
        assert_eq!(sched.len(), 0);
    }

    #[test]
    fn test_stop_task_fires_callbacks_like_completion() {
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        let id = sched
            .run_task(CountedRoutine::new(100))
            .on_done(|c: &mut Ctx| c.events.push("done"))
            .id();

        assert!(sched.stop_task(id, &mut ctx));
        assert_eq!(ctx.events, vec!["done"]);

        // A second stop on the same id is a no-op: callbacks fire exactly once.
        assert!(!sched.stop_task(id, &mut ctx));
        assert_eq!(ctx.events, vec!["done"]);
    }

    #[test]
    fn test_step_error_retains_task() {
        struct Flaky {
            calls: u32,
        }
        impl TaskRoutine<Ctx> for Flaky {
            fn step(&mut self, ctx: &mut Ctx, _dt: Duration) -> Result<StepResult, &'static str> {
                self.calls += 1;
                if self.calls == 1 {
                    return Err("transient failure");
                }
                ctx.steps += 1;
                Ok(StepResult::Continue)
            }
            fn restart(&mut self) {}
        }

        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        let id = sched.run_task(Flaky { calls: 0 }).id();

        sched.tick(&mut ctx, ms(100));
        assert!(sched.is_running(id), "a failed step must not remove the task");
        sched.tick(&mut ctx, ms(100));
        assert_eq!(ctx.steps, 1);
    }

    #[test]
    fn test_tasks_resume_in_registration_order() {
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        sched.run_task(CallbackRoutine::new(|c: &mut Ctx| c.events.push("first")));
        sched.run_task(CallbackRoutine::new(|c: &mut Ctx| c.events.push("second")));

        sched.tick(&mut ctx, ms(100));
        assert_eq!(ctx.events, vec!["first", "second"]);
    }

    #[test]
    fn test_set_timeout_fires_once_after_delay() {
        let mut sched = Scheduler::new();
        let mut ctx = Ctx::default();
        let id = sched.set_timeout(ms(500), |c: &mut Ctx| c.events.push("timeout"));

        for _ in 0..4 {
            sched.tick(&mut ctx, ms(100));
        }
        assert!(ctx.events.is_empty());
        assert!(sched.is_running(id));

        sched.tick(&mut ctx, ms(100));
        assert_eq!(ctx.events, vec!["timeout"]);
        assert!(!sched.is_running(id));
    }
}
