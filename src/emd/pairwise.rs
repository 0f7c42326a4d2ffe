use super::config::Config;
use super::error::Error;
use super::exact::EMD;
use super::handler::Handler;
use super::progress::Progress;
use super::storage::rank;
use super::storage::unrank;
use super::storage::Storage;
use crate::events::Event;
use crate::events::Measure;
use crate::events::Preprocess;
use crate::Distance;
use rayon::prelude::*;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// What a sweep does when one pair fails to solve.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    /// the first failing pair aborts the sweep with its error
    #[default]
    Abort,
    /// failing pairs are tagged NaN, counted, and the sweep finishes
    Tag,
}

/// Drives emd computations across every unordered pair of an event
/// collection, or across the product of two collections.
///
/// Events and the ground measure are shared read-only by the workers;
/// each worker carries its own solver scratch; results land in disjoint
/// slots of the storage buffer or stream to the registered handler.
/// Nothing here blocks on anything but the pool itself.
pub struct Pairwise<M, const D: usize> {
    config: Config,
    measure: M,
    storage: Storage,
    threads: usize,
    on_error: OnError,
    pipeline: Vec<Box<dyn Preprocess<D>>>,
    handler: Option<Box<dyn Handler>>,
    events: Vec<Event<D>>,
    neva: usize,
    nevb: usize,
    cross: bool,
    emds: Vec<Distance>,
    failures: usize,
    done: bool,
}

impl<M, const D: usize> From<(M, Config)> for Pairwise<M, D> {
    fn from((measure, config): (M, Config)) -> Self {
        Self {
            config,
            measure,
            storage: Storage::default(),
            threads: 0,
            on_error: OnError::default(),
            pipeline: Vec::new(),
            handler: None,
            events: Vec::new(),
            neva: 0,
            nevb: 0,
            cross: false,
            emds: Vec::new(),
            failures: 0,
            done: false,
        }
    }
}

impl<M, const D: usize> Pairwise<M, D> {
    pub fn new(measure: M) -> Self {
        Self::from((measure, Config::default()))
    }

    /// choose where results live; External streams them to a handler
    pub fn storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    /// worker count; zero means one per logical cpu
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// what to do when a pair fails to solve
    pub fn on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    /// register a preprocessor; applied once per event at intake
    pub fn preprocess(mut self, preprocessor: impl Preprocess<D> + 'static) -> Self {
        self.pipeline.push(Box::new(preprocessor));
        self
    }

    /// register the observer External storage streams results to
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    /// event counts of the two sides; equal for symmetric sweeps
    pub fn neva(&self) -> usize {
        self.neva
    }

    pub fn nevb(&self) -> usize {
        self.nevb
    }

    /// pairs the current sweep covers
    pub fn pairs(&self) -> usize {
        match self.cross {
            true => self.neva * self.nevb,
            false => self.neva * self.neva.saturating_sub(1) / 2,
        }
    }

    /// whether the last sweep ran to completion
    pub fn done(&self) -> bool {
        self.done
    }

    /// pairs the last sweep tagged as failed
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// the raw storage buffer in the layout the storage mode declares
    pub fn emds(&self) -> &[Distance] {
        &self.emds
    }

    /// emd between events i and j of the last sweep; for two-collection
    /// sweeps i indexes the first collection and j the second
    pub fn emd(&self, i: usize, j: usize) -> Distance {
        assert!(self.done, "no sweep has completed");
        match self.storage {
            Storage::External => panic!("external storage retains no emds"),
            Storage::Full | Storage::FullSymmetric => self.emds[i * self.nevb + j],
            Storage::FlattenedSymmetric => match i.cmp(&j) {
                std::cmp::Ordering::Equal => 0.,
                std::cmp::Ordering::Less => self.emds[rank(j, i)],
                std::cmp::Ordering::Greater => self.emds[rank(i, j)],
            },
        }
    }

    /// smallest stored emd, tagged failures excluded
    pub fn min(&self) -> Distance {
        self.emds
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(Distance::INFINITY, Distance::min)
    }

    /// largest stored emd, tagged failures excluded
    pub fn max(&self) -> Distance {
        self.emds
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(Distance::NEG_INFINITY, Distance::max)
    }

    /// dump the stored emds as little-endian doubles behind a small
    /// self-describing header: magic, layout tag, event counts, length
    pub fn save(&self, path: &str) {
        use byteorder::LittleEndian;
        use byteorder::WriteBytesExt;
        use std::io::Write;
        log::info!("{:<32}{:<32}", "saving emds", path);
        let ref mut file = std::fs::File::create(path).expect("new emds file");
        file.write_all(b"EMDS").expect("magic");
        file.write_u8(match self.storage {
            Storage::Full => 0,
            Storage::FullSymmetric => 1,
            Storage::FlattenedSymmetric => 2,
            Storage::External => 3,
        })
        .expect("storage tag");
        file.write_u64::<LittleEndian>(self.neva as u64).expect("neva");
        file.write_u64::<LittleEndian>(self.nevb as u64).expect("nevb");
        file.write_u64::<LittleEndian>(self.emds.len() as u64)
            .expect("length");
        for value in self.emds.iter() {
            file.write_f64::<LittleEndian>(*value).expect("emd value");
        }
    }

    /// run the preprocessor pipeline over every event exactly once
    fn intake(&self, events: Vec<Event<D>>) -> Vec<Event<D>> {
        match self.pipeline.is_empty() {
            true => events,
            false => events
                .into_iter()
                .map(|event| self.pipeline.iter().fold(event, |event, p| p.transform(event)))
                .collect(),
        }
    }

    /// storage and handler settings that can never produce a sweep
    fn validate(&self) -> Result<(), Error> {
        if self.cross
            && matches!(
                self.storage,
                Storage::FullSymmetric | Storage::FlattenedSymmetric
            )
        {
            return Err(Error::Mode(
                "two-collection sweeps have no symmetry to exploit; use Full or External storage",
            ));
        }
        if self.storage == Storage::External && self.handler.is_none() {
            return Err(Error::Mode("external storage requires a handler"));
        }
        if self.storage != Storage::External && self.handler.is_some() {
            return Err(Error::Mode("a handler requires external storage"));
        }
        Ok(())
    }
}

impl<M: Measure<D>, const D: usize> Pairwise<M, D> {
    /// sweep every unordered pair of one collection
    pub fn compute(&mut self, events: Vec<Event<D>>) -> Result<(), Error> {
        self.cross = false;
        self.neva = events.len();
        self.nevb = events.len();
        self.events = self.intake(events);
        self.sweep()
    }

    /// sweep the full product of two collections
    pub fn compute_cross(&mut self, lhs: Vec<Event<D>>, rhs: Vec<Event<D>>) -> Result<(), Error> {
        self.cross = true;
        self.neva = lhs.len();
        self.nevb = rhs.len();
        let mut combined = lhs;
        combined.extend(rhs);
        self.events = self.intake(combined);
        self.sweep()
    }

    /// Fan the pairs out over a dedicated pool. Symmetric dense modes
    /// compute the strict triangle in parallel and mirror it after;
    /// flattened and cross layouts write their disjoint slots directly;
    /// External streams every value to the handler and stores nothing.
    fn sweep(&mut self) -> Result<(), Error> {
        self.validate()?;
        self.done = false;
        self.failures = 0;
        let pairs = self.pairs();
        let slots = match self.cross {
            true => self.neva * self.nevb,
            false => self.storage.slots(self.neva),
        };
        self.emds.clear();
        self.emds.resize(slots, 0.);
        let threads = match self.threads {
            0 => num_cpus::get(),
            t => t,
        };
        log::info!("{:<32}{:<32}", "sweeping pairs", pairs);
        log::info!("{:<32}{:<32}", "over threads", threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("build worker pool");
        let progress = Progress::new(pairs, 20);
        let errors = AtomicUsize::new(0);
        // split borrows so workers share events read-only while results
        // land in disjoint slots
        let events = &self.events;
        let measure = &self.measure;
        let config = &self.config;
        let emds = &mut self.emds;
        let handler = self.handler.as_deref();
        let on_error = self.on_error;
        let cross = self.cross;
        let neva = self.neva;
        let nevb = self.nevb;
        let storage = self.storage;
        let init = || EMD::<&M, D>::from((measure, config.clone()));
        let solve = |emd: &mut EMD<&M, D>, a: usize, b: usize| emd.compute(&events[a], &events[b]);
        let result = pool.install(|| match (cross, storage) {
            (_, Storage::External) => {
                let handler = handler.expect("external sweeps have a handler");
                (0..pairs).into_par_iter().try_for_each_init(init, |emd, k| {
                    let (i, j) = match cross {
                        true => (k / nevb, k % nevb),
                        false => unrank(k),
                    };
                    let solved = match cross {
                        true => solve(emd, i, neva + j),
                        false => solve(emd, i, j),
                    };
                    match solved.map_err(|e| e.at(i, j)) {
                        Ok(value) => {
                            handler.observe(value);
                            progress.tick();
                            Ok(())
                        }
                        Err(e) => match on_error {
                            OnError::Abort => Err(e),
                            OnError::Tag => {
                                errors.fetch_add(1, Ordering::Relaxed);
                                progress.tick();
                                Ok(())
                            }
                        },
                    }
                })
            }
            (false, Storage::FlattenedSymmetric) => emds
                .par_iter_mut()
                .enumerate()
                .try_for_each_init(init, |emd, (k, slot)| {
                    let (i, j) = unrank(k);
                    match solve(emd, i, j).map_err(|e| e.at(i, j)) {
                        Ok(value) => {
                            *slot = value;
                            progress.tick();
                            Ok(())
                        }
                        Err(e) => match on_error {
                            OnError::Abort => Err(e),
                            OnError::Tag => {
                                *slot = Distance::NAN;
                                errors.fetch_add(1, Ordering::Relaxed);
                                progress.tick();
                                Ok(())
                            }
                        },
                    }
                }),
            (false, Storage::Full) | (false, Storage::FullSymmetric) => (0..pairs)
                .into_par_iter()
                .map_init(init, |emd, k| {
                    let (i, j) = unrank(k);
                    match solve(emd, i, j).map_err(|e| e.at(i, j)) {
                        Ok(value) => {
                            progress.tick();
                            Ok(value)
                        }
                        Err(e) => match on_error {
                            OnError::Abort => Err(e),
                            OnError::Tag => {
                                errors.fetch_add(1, Ordering::Relaxed);
                                progress.tick();
                                Ok(Distance::NAN)
                            }
                        },
                    }
                })
                .collect::<Result<Vec<_>, Error>>()
                .map(|triangle| {
                    // the diagonal stays at its prefilled zero
                    for (k, value) in triangle.into_iter().enumerate() {
                        let (i, j) = unrank(k);
                        emds[i * neva + j] = value;
                        emds[j * neva + i] = value;
                    }
                }),
            (true, Storage::Full) => emds
                .par_iter_mut()
                .enumerate()
                .try_for_each_init(init, |emd, (k, slot)| {
                    let (i, j) = (k / nevb, k % nevb);
                    match solve(emd, i, neva + j).map_err(|e| e.at(i, j)) {
                        Ok(value) => {
                            *slot = value;
                            progress.tick();
                            Ok(())
                        }
                        Err(e) => match on_error {
                            OnError::Abort => Err(e),
                            OnError::Tag => {
                                *slot = Distance::NAN;
                                errors.fetch_add(1, Ordering::Relaxed);
                                progress.tick();
                                Ok(())
                            }
                        },
                    }
                }),
            _ => unreachable!("validated storage mode"),
        });
        self.failures = errors.load(Ordering::Relaxed);
        match &result {
            Ok(()) => log::info!("{:<32}{:<32}", "swept pairs", pairs),
            Err(e) => log::error!("{:<32}{}", "sweep aborted", e),
        }
        if self.failures > 0 {
            log::warn!("{:<32}{:<32}", "failed pairs", self.failures);
        }
        self.done = result.is_ok();
        result
    }
}

impl<M, const D: usize> std::fmt::Display for Pairwise<M, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "pairwise emd sweep")?;
        writeln!(f, "  events: {} x {}", self.neva, self.nevb)?;
        writeln!(f, "  pairs: {}", self.pairs())?;
        writeln!(f, "  storage: {:?}", self.storage)?;
        writeln!(f, "  on error: {:?}", self.on_error)?;
        match self.threads {
            0 => writeln!(f, "  threads: all")?,
            t => writeln!(f, "  threads: {}", t)?,
        }
        write!(f, "{}", self.config)
    }
}
