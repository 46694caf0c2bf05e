//! Population job: bulk-load synthetic persons through the normal write path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::generator::PersonGenerator;
use crate::metrics;
use crate::person::Person;

use super::{PopulationResult, SyncError, SyncService};

/// Number of fixed persons every run starts with
const SEED_COUNT: u64 = 2;

/// Clears the running flag however the run ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncService {
    /// Generate and persist `target` persons in `batch_size` chunks.
    ///
    /// The two seed persons ("Joe Smith" and "France Gall") always come
    /// first, so a target below 2 still processes 2. The counter advances
    /// per generated person, ahead of the chunk save. Every chunk goes through
    /// [`save_batch`](Self::save_batch), so the index follows the store.
    /// Fails with `PopulationInProgress` while another run is active.
    #[tracing::instrument(skip(self))]
    pub async fn populate(&self, target: u64) -> Result<PopulationResult, SyncError> {
        let state = &self.population;
        if state
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SyncError::PopulationInProgress);
        }
        let _running = RunningGuard(&state.running);

        state.processed.store(0, Ordering::SeqCst);
        state
            .started_at_nanos
            .store(state.base.elapsed().as_nanos() as u64, Ordering::SeqCst);
        let started = Instant::now();
        info!(target, batch_size = self.config.batch_size, "Population started");

        if let Err(e) = self.generate_and_save(target).await {
            warn!(
                error = %e,
                processed = state.processed.load(Ordering::SeqCst),
                "Population aborted"
            );
            return Err(e);
        }

        let result = PopulationResult::new(
            state.processed.load(Ordering::SeqCst),
            started.elapsed().as_millis() as u64,
        );
        metrics::record_population(result.total, started.elapsed());
        info!(
            total = result.total,
            took_ms = result.took_ms,
            rate = result.rate,
            "Population finished"
        );
        Ok(result)
    }

    async fn generate_and_save(&self, target: u64) -> Result<(), SyncError> {
        let batch_size = self.config.batch_size.max(1);
        let mut generator = PersonGenerator::new();
        let seeds = generator.seeds();
        let synthetic = target.saturating_sub(SEED_COUNT);
        let persons = seeds
            .into_iter()
            .chain(std::iter::repeat_with(|| generator.person()).take(synthetic as usize));

        let mut pending: Vec<Person> = Vec::with_capacity(batch_size);
        for person in persons {
            pending.push(person);
            self.population.processed.fetch_add(1, Ordering::SeqCst);
            if pending.len() >= batch_size {
                self.save_population_chunk(std::mem::take(&mut pending)).await?;
            }
        }
        if !pending.is_empty() {
            self.save_population_chunk(pending).await?;
        }
        Ok(())
    }

    async fn save_population_chunk(&self, chunk: Vec<Person>) -> Result<(), SyncError> {
        let saved = self.save_batch(chunk).await?;
        let processed = self.population.processed.load(Ordering::SeqCst);
        metrics::set_population_processed(processed);
        debug!(processed, chunk = saved.len(), "Population chunk saved");
        Ok(())
    }

    /// Run [`populate`](Self::populate) as a background task.
    pub fn spawn_populate(
        self: &Arc<Self>,
        target: u64,
    ) -> JoinHandle<Result<PopulationResult, SyncError>> {
        let service = Arc::clone(self);
        tokio::spawn(async move { service.populate(target).await })
    }

    /// Progress of the current (or last) run, from the live counters.
    #[must_use]
    pub fn poll_progress(&self) -> PopulationResult {
        let state = &self.population;
        let total = state.processed.load(Ordering::SeqCst);
        let started = state.started_at_nanos.load(Ordering::SeqCst);
        let now = state.base.elapsed().as_nanos() as u64;
        PopulationResult::new(total, now.saturating_sub(started) / 1_000_000)
    }

    #[must_use]
    pub fn is_populating(&self) -> bool {
        self.population.running.load(Ordering::SeqCst)
    }
}
