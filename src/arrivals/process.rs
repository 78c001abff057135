//! process — the arrival-process state machine.
//!
//! Purpose
//! -------
//! [`ArrivalProcess`] is the single concrete process type. It owns one
//! [`ArrivalModel`] strategy and drives it through the replication
//! lifecycle: draw busyness and latent state at `init`, schedule arrivals
//! on an external [`Scheduler`], turn each firing into a [`Contact`] and
//! broadcast it to the registered listeners.
//!
//! Key behaviors
//! -------------
//! - States `Stopped → Started → Stopped`; `init` returns to `Stopped`
//!   from either state and may be called before every replication.
//! - `start` and `start_stationary` fail with an illegal-state error when
//!   already started; `stop` fails when not started.
//! - Period boundaries are pushed in by the caller through
//!   [`ArrivalProcess::on_period_change`]; the model decides whether the
//!   pending event is kept, rescaled, resampled or dropped.
//! - A `+∞` delay leaves the process started with nothing pending, until
//!   the next period change or `init`.
//!
//! Invariants & assumptions
//! ------------------------
//! - At most one pending arrival event per process.
//! - The random stream is borrowed only for the duration of a model call,
//!   never across a listener broadcast, so processes sharing one stream
//!   draw from it sequentially.
//! - Calling `start` without a prior `init` keeps the model's previous
//!   (or default) latent state. This is allowed.
use std::rc::Rc;

use tracing::{debug, warn};

use crate::{
    arrivals::{
        core::{
            busyness::{BusynessModel, BusynessState},
            contact::{Contact, ContactFactory, ProcessId},
            listeners::{ListenerHandle, ListenerRegistry},
            periods::PeriodOracle,
            scheduler::{EventId, Scheduler},
        },
        counts::CountModel,
        errors::{ArrivalError, ArrivalResult},
        models::{ArrivalModel, CountArrivals, ModelContext, PeriodTransition},
    },
    random::SharedStream,
};

/// Lifecycle state of an [`ArrivalProcess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Stopped,
    Started,
}

/// Arrival process driving one [`ArrivalModel`].
pub struct ArrivalProcess<M: ArrivalModel> {
    id: ProcessId,
    model: M,
    periods: Rc<dyn PeriodOracle>,
    busyness_model: BusynessModel,
    busyness: BusynessState,
    stream: SharedStream,
    factory: Box<dyn ContactFactory>,
    listeners: Rc<ListenerRegistry>,
    status: ProcessStatus,
    pending: Option<EventId>,
    current_period: usize,
    arrivals: u64,
}

impl<M: ArrivalModel + std::fmt::Debug> std::fmt::Debug for ArrivalProcess<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrivalProcess")
            .field("id", &self.id)
            .field("model", &self.model)
            .field("factory", &self.factory.name())
            .field("status", &self.status)
            .field("busyness", &self.busyness)
            .field("current_period", &self.current_period)
            .field("arrivals", &self.arrivals)
            .finish()
    }
}

impl<M: ArrivalModel> ArrivalProcess<M> {
    /// New stopped process with unit busyness and an empty listener list.
    pub fn new(
        id: ProcessId, model: M, periods: Rc<dyn PeriodOracle>, busyness_model: BusynessModel, stream: SharedStream,
        factory: Box<dyn ContactFactory>,
    ) -> Self {
        Self {
            id,
            model,
            periods,
            busyness_model,
            busyness: BusynessState::unit(),
            stream,
            factory,
            listeners: ListenerRegistry::new(),
            status: ProcessStatus::Stopped,
            pending: None,
            current_period: 0,
            arrivals: 0,
        }
    }

    /// Share an existing listener registry instead of a private one.
    pub fn with_listeners(mut self, listeners: Rc<ListenerRegistry>) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the model, e.g. to change its parameters between
    /// replications.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn periods(&self) -> &dyn PeriodOracle {
        &*self.periods
    }

    pub fn busyness_model(&self) -> &BusynessModel {
        &self.busyness_model
    }

    pub fn set_busyness_model(&mut self, busyness_model: BusynessModel) {
        self.busyness_model = busyness_model;
    }

    /// Busyness of the current replication.
    pub fn busyness(&self) -> &BusynessState {
        &self.busyness
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    pub fn is_started(&self) -> bool {
        self.status == ProcessStatus::Started
    }

    /// Pending arrival event, if any.
    pub fn pending_event(&self) -> Option<EventId> {
        self.pending
    }

    /// Period the process last saw.
    pub fn current_period(&self) -> usize {
        self.current_period
    }

    /// Arrivals since the last `init`.
    pub fn arrivals(&self) -> u64 {
        self.arrivals
    }

    pub fn listeners(&self) -> &Rc<ListenerRegistry> {
        &self.listeners
    }

    /// # Errors
    /// - [`ArrivalError::IllegalState`] during a broadcast.
    pub fn add_listener(&self, listener: ListenerHandle) -> ArrivalResult<()> {
        self.listeners.add(listener)
    }

    /// # Errors
    /// - [`ArrivalError::IllegalState`] during a broadcast.
    pub fn remove_listener(&self, listener: &ListenerHandle) -> ArrivalResult<bool> {
        self.listeners.remove(listener)
    }

    /// Prepare a new replication with busyness drawn from the busyness model.
    ///
    /// # Errors
    /// - Busyness or latent-state draws that fail.
    pub fn init(&mut self, scheduler: &mut dyn Scheduler) -> ArrivalResult<()> {
        let busyness = self.busyness_model.draw(&mut self.stream.borrow_mut())?;
        self.init_with_busyness(scheduler, busyness)
    }

    /// Prepare a new replication with an explicit busyness state.
    ///
    /// # Errors
    /// - Latent-state draws that fail, or a latent vector that does not
    ///   match the period structure.
    pub fn init_with_busyness(&mut self, scheduler: &mut dyn Scheduler, busyness: BusynessState) -> ArrivalResult<()> {
        self.cancel_pending(scheduler);
        self.status = ProcessStatus::Stopped;
        self.arrivals = 0;
        self.busyness = busyness;
        let now = scheduler.now();
        self.current_period = self.periods.period_of(now);
        self.with_model(now, |model, ctx| model.init(ctx))?;
        debug!(process = self.id.0, model = self.model.name(), busyness = self.busyness.day_factor(), "process initialized");
        Ok(())
    }

    /// Schedule the first arrival at the model's next time.
    ///
    /// # Errors
    /// - [`ArrivalError::IllegalState`] if already started.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) -> ArrivalResult<()> {
        self.ensure_stopped()?;
        let now = scheduler.now();
        self.current_period = self.periods.period_of(now);
        let delay = self.with_model(now, |model, ctx| model.next_time(ctx))?;
        self.status = ProcessStatus::Started;
        self.schedule(scheduler, delay);
        debug!(process = self.id.0, delay, "process started");
        Ok(())
    }

    /// Schedule the first arrival `delay` from now without consulting the
    /// model; later arrivals follow the model.
    ///
    /// # Errors
    /// - [`ArrivalError::InvalidParameter`] for a negative or NaN delay.
    /// - [`ArrivalError::IllegalState`] if already started.
    pub fn start_with_delay(&mut self, scheduler: &mut dyn Scheduler, delay: f64) -> ArrivalResult<()> {
        if delay.is_nan() || delay < 0.0 {
            return Err(ArrivalError::InvalidParameter {
                name: "start delay",
                value: delay,
                reason: "The first delay must be non-negative.",
            });
        }
        self.ensure_stopped()?;
        self.current_period = self.periods.period_of(scheduler.now());
        self.status = ProcessStatus::Started;
        self.schedule(scheduler, delay);
        debug!(process = self.id.0, delay, "process started with explicit delay");
        Ok(())
    }

    /// Start in stationary mode on a locked period oracle.
    ///
    /// # Errors
    /// - [`ArrivalError::IllegalState`] if already started.
    /// - [`ArrivalError::Unsupported`] if the oracle is not locked or the
    ///   model has no stationary mode.
    pub fn start_stationary(&mut self, scheduler: &mut dyn Scheduler) -> ArrivalResult<()> {
        self.ensure_stopped()?;
        let now = scheduler.now();
        self.current_period = self.periods.period_of(now);
        let delay = self.with_model(now, |model, ctx| model.start_stationary(ctx))?;
        self.status = ProcessStatus::Started;
        self.schedule(scheduler, delay);
        debug!(process = self.id.0, period = self.current_period, delay, "process started in stationary mode");
        Ok(())
    }

    /// Cancel the pending arrival and stop.
    ///
    /// # Errors
    /// - [`ArrivalError::IllegalState`] if not started.
    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) -> ArrivalResult<()> {
        if !self.is_started() {
            return Err(ArrivalError::illegal("The arrival process is not started."));
        }
        self.cancel_pending(scheduler);
        self.status = ProcessStatus::Stopped;
        debug!(process = self.id.0, arrivals = self.arrivals, "process stopped");
        Ok(())
    }

    /// Handle the firing of the pending arrival event `event`.
    ///
    /// Creates the contact, notifies listeners, then schedules the next
    /// arrival. Returns the new contact. On any error the process is left
    /// stopped with nothing pending.
    ///
    /// # Errors
    /// - [`ArrivalError::IllegalState`] if `event` is not this process's
    ///   pending event.
    /// - [`ArrivalError::ContactInstantiation`] when the factory fails.
    /// - Listener-registry and model errors.
    pub fn fire(&mut self, scheduler: &mut dyn Scheduler, event: EventId) -> ArrivalResult<Contact> {
        if !self.is_started() || self.pending != Some(event) {
            return Err(ArrivalError::illegal("The fired event is not the pending arrival of this process."));
        }
        self.pending = None;
        let result = self.emit_and_reschedule(scheduler);
        if let Err(err) = &result {
            self.status = ProcessStatus::Stopped;
            warn!(process = self.id.0, error = %err, "arrival failed; process stopped");
        }
        result
    }

    fn emit_and_reschedule(&mut self, scheduler: &mut dyn Scheduler) -> ArrivalResult<Contact> {
        let now = scheduler.now();
        let contact = self.factory.create(self.id, now).map_err(|reason| ArrivalError::ContactInstantiation {
            factory: self.factory.name().to_string(),
            reason,
        })?;
        self.arrivals += 1;
        self.listeners.notify(&contact)?;
        let delay = self.with_model(now, |model, ctx| model.next_time(ctx))?;
        self.schedule(scheduler, delay);
        Ok(contact)
    }

    /// Notify the process that the period `new_period` starts now.
    ///
    /// # Errors
    /// - Model errors while computing the transition or a new delay.
    pub fn on_period_change(&mut self, scheduler: &mut dyn Scheduler, new_period: usize) -> ArrivalResult<()> {
        let old = std::mem::replace(&mut self.current_period, new_period);
        if !self.is_started() || old == new_period {
            return Ok(());
        }
        let now = scheduler.now();
        let transition = self.with_model(now, |model, ctx| model.period_changed(ctx, old, new_period))?;
        match transition {
            PeriodTransition::Unchanged => {
                if self.pending.is_none() {
                    self.resample(scheduler)?;
                }
            }
            PeriodTransition::Rescale(factor) => {
                let residual = self.pending.and_then(|id| scheduler.event_time(id)).map(|t| (t - now).max(0.0));
                match (self.pending, residual) {
                    (Some(id), Some(residual)) => {
                        scheduler.reschedule(id, residual * factor);
                    }
                    _ => self.resample(scheduler)?,
                }
            }
            PeriodTransition::Resample => self.resample(scheduler)?,
            PeriodTransition::Suspend => self.cancel_pending(scheduler),
        }
        Ok(())
    }

    /// Realized rate in period `p`.
    ///
    /// # Errors
    /// - [`ArrivalError::Unsupported`] if the model cannot provide it.
    pub fn arrival_rate(&self, p: usize) -> ArrivalResult<f64> {
        self.model.arrival_rate(&*self.periods, &self.busyness, p)
    }

    /// Mean rate in period `p` over replications.
    ///
    /// # Errors
    /// - [`ArrivalError::Unsupported`] if the model cannot provide it.
    pub fn expected_arrival_rate(&self, p: usize) -> ArrivalResult<f64> {
        self.model.expected_arrival_rate(&*self.periods, &self.busyness_model, p)
    }

    fn resample(&mut self, scheduler: &mut dyn Scheduler) -> ArrivalResult<()> {
        self.cancel_pending(scheduler);
        let delay = self.with_model(scheduler.now(), |model, ctx| model.next_time(ctx))?;
        self.schedule(scheduler, delay);
        Ok(())
    }

    fn ensure_stopped(&self) -> ArrivalResult<()> {
        if self.is_started() {
            return Err(ArrivalError::illegal("The arrival process is already started."));
        }
        Ok(())
    }

    fn schedule(&mut self, scheduler: &mut dyn Scheduler, delay: f64) {
        self.pending = delay.is_finite().then(|| scheduler.schedule(delay));
    }

    fn cancel_pending(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
    }

    fn with_model<R>(&mut self, now: f64, f: impl FnOnce(&mut M, &mut ModelContext<'_>) -> ArrivalResult<R>) -> ArrivalResult<R> {
        let Self { model, periods, busyness, stream, .. } = self;
        let mut stream = stream.borrow_mut();
        let mut ctx = ModelContext { now, periods: &**periods, busyness: &*busyness, stream: &mut *stream };
        f(model, &mut ctx)
    }
}

impl<C: CountModel> ArrivalProcess<CountArrivals<C>> {
    /// Replace the counts drawn at `init` for the current replication.
    ///
    /// # Errors
    /// - [`ArrivalError::IllegalState`] while started, or for a non-zero
    ///   wrap-up count.
    /// - [`ArrivalError::LengthMismatch`] for a count vector that does not
    ///   cover every period.
    pub fn force_counts(&mut self, counts: Vec<u64>) -> ArrivalResult<()> {
        self.ensure_stopped()?;
        let Self { model, periods, stream, .. } = self;
        model.force_counts(counts, &**periods, &mut stream.borrow_mut())
    }
}
