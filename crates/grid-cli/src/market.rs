//! In-memory market items: one symbol and its live security data per row.

use std::rc::Rc;

use grid_core::{
    DomainEntity, EntityValueSource, InMemoryEntity, RecordItem, RecordKey, ValueSource,
    ValueSourceFactory,
};
use grid_model::{
    Correctness, EnumValue, FieldSourceDefinition, FieldSourceTypeId, SecurityField, SymbolField,
    ValueContent,
};

/// Field sources a market item can serve.
pub const MARKET_SOURCES: &[FieldSourceTypeId] =
    &[FieldSourceTypeId::Symbol, FieldSourceTypeId::Security];

const TRADING: u32 = 1;

#[derive(Debug)]
pub struct MarketItem {
    symbol: Rc<InMemoryEntity<SymbolField>>,
    security: Rc<InMemoryEntity<SecurityField>>,
}

impl MarketItem {
    pub fn new(code: &str, name: &str, last: f64) -> Rc<Self> {
        let symbol = Rc::new(InMemoryEntity::new(code));
        symbol.begin_change();
        symbol.set(SymbolField::Code, ValueContent::text(code));
        symbol.set(SymbolField::Name, ValueContent::text(name));
        symbol.set(
            SymbolField::Market,
            ValueContent::Enumeration(Some(EnumValue::new(1, "ASX"))),
        );
        symbol.end_change();

        let security = Rc::new(InMemoryEntity::new(code));
        security.begin_change();
        for field in [
            SecurityField::Last,
            SecurityField::Open,
            SecurityField::High,
            SecurityField::Low,
            SecurityField::PreviousClose,
        ] {
            security.set(field, ValueContent::Number(Some(last)));
        }
        security.set(SecurityField::Volume, ValueContent::Integer(Some(0)));
        security.set(
            SecurityField::TradingState,
            ValueContent::Enumeration(Some(EnumValue::new(TRADING, "Trading"))),
        );
        security.set(SecurityField::Halted, ValueContent::Boolean(Some(false)));
        security.end_change();

        Rc::new(Self { symbol, security })
    }

    pub fn code(&self) -> &str {
        self.symbol.key()
    }

    pub fn symbol(&self) -> &Rc<InMemoryEntity<SymbolField>> {
        &self.symbol
    }

    pub fn security(&self) -> &Rc<InMemoryEntity<SecurityField>> {
        &self.security
    }

    /// Trade at `price` for `volume` shares; raises one security change.
    pub fn trade(&self, price: f64, volume: i64) {
        let security = self.security.as_ref();
        security.begin_change();
        let high = number(security, SecurityField::High).map_or(price, |high| high.max(price));
        let low = number(security, SecurityField::Low).map_or(price, |low| low.min(price));
        let traded = integer(security, SecurityField::Volume).unwrap_or(0) + volume;
        security.set(SecurityField::Last, ValueContent::Number(Some(price)));
        security.set(SecurityField::High, ValueContent::Number(Some(high)));
        security.set(SecurityField::Low, ValueContent::Number(Some(low)));
        security.set(SecurityField::Volume, ValueContent::Integer(Some(traded)));
        security.end_change();
    }

    /// Move the quote around the last price; raises one security change.
    pub fn quote(&self, bid: f64, ask: f64) {
        self.security.begin_change();
        self.security
            .set(SecurityField::Bid, ValueContent::Number(Some(bid)));
        self.security
            .set(SecurityField::Ask, ValueContent::Number(Some(ask)));
        self.security.end_change();
    }

    pub fn last(&self) -> Option<f64> {
        number(self.security.as_ref(), SecurityField::Last)
    }

    pub fn correctness(&self) -> Correctness {
        self.security.correctness()
    }

    pub fn set_correctness(&self, correctness: Correctness) {
        self.security.set_correctness(correctness);
    }

    /// Entity subscriptions still held, symbol and security together.
    pub fn subscriber_count(&self) -> usize {
        self.symbol.subscriber_count() + self.security.subscriber_count()
    }
}

fn number(security: &InMemoryEntity<SecurityField>, field: SecurityField) -> Option<f64> {
    match security.load(field) {
        ValueContent::Number(value) => value,
        _ => None,
    }
}

fn integer(security: &InMemoryEntity<SecurityField>, field: SecurityField) -> Option<i64> {
    match security.load(field) {
        ValueContent::Integer(value) => value,
        _ => None,
    }
}

impl RecordItem for MarketItem {
    fn map_key(&self) -> RecordKey {
        RecordKey::new(self.code())
    }
}

/// Builds entity-backed value sources for market items.
#[derive(Debug, Default)]
pub struct MarketValueSourceFactory;

impl ValueSourceFactory<MarketItem> for MarketValueSourceFactory {
    fn create_value_source(
        &self,
        definition: Rc<FieldSourceDefinition>,
        item: &Rc<MarketItem>,
    ) -> Box<dyn ValueSource> {
        match definition.type_id() {
            FieldSourceTypeId::Symbol => {
                Box::new(EntityValueSource::new(definition, Rc::clone(&item.symbol)))
            }
            FieldSourceTypeId::Security => {
                Box::new(EntityValueSource::new(definition, Rc::clone(&item.security)))
            }
            other => panic!("market items have no {other} fields"),
        }
    }
}
