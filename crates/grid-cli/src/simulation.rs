//! Deterministic market simulation driven through a record source.
//!
//! A list of market items is bound to a [`RecordSource`]; every tick either
//! trades a row, restructures the list or flips a security's correctness.
//! The report counts what the record source raised and checks that closing it
//! released every entity subscription.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, bail};
use grid_core::{
    BadnessList, ObservableList, RecordSource, RecordSourceDefinition, RecordSourceEvent,
    ValueChangeKind,
};
use grid_model::{Badness, Correctness, Field, FieldSourceDefinitionCache, FieldSourceTypeId, Value};
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use tracing::{debug, info, info_span};

use crate::market::{MARKET_SOURCES, MarketItem, MarketValueSourceFactory};
use crate::settings::SimulationSettings;

const SOURCE_NAME: &str = "simulation";

const COMPANY_NAMES: &[&str] = &[
    "Acme Mining",
    "Banksia Bank",
    "Coral Energy",
    "Dingo Logistics",
    "Eucalypt Health",
    "Fern Telecom",
    "Gecko Retail",
    "Harbour Property",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub rows: usize,
    pub ticks: usize,
    pub seed: u64,
    pub field_sources: Vec<FieldSourceTypeId>,
    pub invalidate_every: usize,
}

impl From<&SimulationSettings> for SimulationConfig {
    fn from(settings: &SimulationSettings) -> Self {
        Self {
            rows: settings.rows,
            ticks: settings.ticks,
            seed: settings.seed,
            field_sources: settings.field_sources.clone(),
            invalidate_every: settings.invalidate_every,
        }
    }
}

/// Record source events seen during a run, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub inserted: usize,
    pub removed: usize,
    pub moved: usize,
    pub replaced: usize,
    pub all_records_changed: usize,
    pub fields_changed: usize,
    pub badness_changed: usize,
    pub value_batches: usize,
    pub value_updates: usize,
    pub attribute_updates: usize,
}

impl EventCounts {
    fn record(&mut self, event: &RecordSourceEvent) {
        match event {
            RecordSourceEvent::RecordsInserted { count, .. } => self.inserted += count,
            RecordSourceEvent::RecordsRemoved { count, .. } => self.removed += count,
            RecordSourceEvent::RecordsMoved { count, .. } => self.moved += count,
            RecordSourceEvent::RecordsReplaced { count, .. } => self.replaced += count,
            RecordSourceEvent::AllRecordsChanged => self.all_records_changed += 1,
            RecordSourceEvent::FieldsChanged => self.fields_changed += 1,
            RecordSourceEvent::BadnessChanged(_) => self.badness_changed += 1,
            RecordSourceEvent::RecordValuesChanged { changes, .. } => {
                self.value_batches += 1;
                for change in changes {
                    match change.kind {
                        ValueChangeKind::Update => self.value_updates += 1,
                        ValueChangeKind::Attributes => self.attribute_updates += 1,
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub key: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub counts: EventCounts,
    pub fields: Vec<Field>,
    /// The grid as it stood after the last tick.
    pub rows: Vec<GridRow>,
    pub badness: Badness,
    /// Entity, list and badness subscriptions still held after closing.
    pub leaked_subscriptions: usize,
}

/// Run the simulation to completion.
///
/// # Errors
///
/// Returns an error if a requested field source cannot be served by market
/// items, or if the record source cannot be opened.
pub fn run_simulation(
    cache: &Rc<FieldSourceDefinitionCache>,
    config: &SimulationConfig,
) -> Result<SimulationReport> {
    let _span = info_span!("simulate", seed = config.seed, rows = config.rows).entered();
    if let Some(unsupported) = config
        .field_sources
        .iter()
        .find(|type_id| !MARKET_SOURCES.contains(type_id))
    {
        bail!("market items cannot serve {unsupported} fields");
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut minted = 0usize;
    let mut retired: Vec<Rc<MarketItem>> = Vec::new();

    let list = Rc::new(ObservableList::<MarketItem>::new());
    list.set_badness(Badness::loading("connecting to feed"));

    let source = RecordSource::new(
        SOURCE_NAME,
        Rc::clone(cache),
        Rc::new(MarketValueSourceFactory),
    );
    let counts = Rc::new(RefCell::new(EventCounts::default()));
    let sink = Rc::clone(&counts);
    source.subscribe(move |event: &RecordSourceEvent| sink.borrow_mut().record(event));
    source.open(
        RecordSourceDefinition::new(MARKET_SOURCES.to_vec())
            .with_active(config.field_sources.clone())
            .with_list(Rc::clone(&list) as Rc<dyn BadnessList<MarketItem>>),
    )?;

    let initial = (0..config.rows)
        .map(|_| mint_item(&mut rng, &mut minted))
        .collect();
    list.insert(0, initial);
    list.set_badness(Badness::Good);

    for tick in 0..config.ticks {
        apply_tick(&list, &mut rng, &mut minted, &mut retired);
        if config.invalidate_every > 0
            && (tick + 1) % config.invalidate_every == 0
            && let Some(item) = pick(&list, &mut rng)
        {
            let next = if item.correctness().is_good() {
                Correctness::Suspect
            } else {
                Correctness::Good
            };
            debug!(code = item.code(), correctness = next.as_str(), "correctness flip");
            item.set_correctness(next);
        }
    }

    let fields = source.fields();
    let rows: Vec<GridRow> = (0..source.count())
        .map(|index| GridRow {
            key: source.record_key(index).as_str().to_string(),
            values: source.values(index),
        })
        .collect();
    let badness = source.badness();

    source.close();
    let leaked_subscriptions = list
        .items()
        .iter()
        .chain(retired.iter())
        .map(|item| item.subscriber_count())
        .sum::<usize>()
        + list.list_subscriber_count()
        + list.badness_subscriber_count();

    let counts = counts.borrow().clone();
    info!(
        ticks = config.ticks,
        rows = rows.len(),
        batches = counts.value_batches,
        leaked = leaked_subscriptions,
        "simulation finished"
    );

    Ok(SimulationReport {
        counts,
        fields,
        rows,
        badness,
        leaked_subscriptions,
    })
}

fn apply_tick(
    list: &ObservableList<MarketItem>,
    rng: &mut ChaCha8Rng,
    minted: &mut usize,
    retired: &mut Vec<Rc<MarketItem>>,
) {
    let len = list.count();
    match rng.next_u64() % 20 {
        0 => {
            let index = below(rng, len + 1);
            list.insert(index, vec![mint_item(rng, minted)]);
        }
        1 if len > 1 => {
            let index = below(rng, len);
            retired.extend(list.remove(index, 1));
        }
        2 if len > 1 => {
            let from = below(rng, len);
            let to = below(rng, len);
            list.move_range(from, 1, to);
        }
        _ => {
            let Some(item) = pick(list, rng) else {
                return;
            };
            let last = item.last().unwrap_or(1.0);
            let price = round_cents(last * (1.0 + drift(rng)));
            let volume = 100 * (1 + below(rng, 50) as i64);
            item.trade(price, volume);
            item.quote(round_cents(price - 0.01), round_cents(price + 0.01));
        }
    }
}

fn mint_item(rng: &mut ChaCha8Rng, minted: &mut usize) -> Rc<MarketItem> {
    let number = *minted;
    *minted += 1;
    let code = format!("SIM{number:03}");
    let name = COMPANY_NAMES[number % COMPANY_NAMES.len()];
    let price = round_cents(5.0 + below(rng, 9500) as f64 / 100.0);
    MarketItem::new(&code, name, price)
}

fn pick(list: &ObservableList<MarketItem>, rng: &mut ChaCha8Rng) -> Option<Rc<MarketItem>> {
    match list.count() {
        0 => None,
        len => Some(list.get(below(rng, len))),
    }
}

fn below(rng: &mut ChaCha8Rng, bound: usize) -> usize {
    (rng.next_u64() % bound as u64) as usize
}

/// Relative price move in [-2%, +2%].
fn drift(rng: &mut ChaCha8Rng) -> f64 {
    (below(rng, 401) as f64 - 200.0) / 10_000.0
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
