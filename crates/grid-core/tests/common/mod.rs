//! Shared fixtures: a quote row made of a symbol and its security data.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use grid_core::{
    EntityValueSource, InMemoryEntity, RecordItem, RecordKey, RecordSource, RecordSourceEvent,
    ValueSource, ValueSourceFactory,
};
use grid_model::{
    FieldSourceDefinition, FieldSourceTypeId, SecurityField, SymbolField, ValueContent,
};

pub struct Quote {
    pub symbol: Rc<InMemoryEntity<SymbolField>>,
    pub security: Rc<InMemoryEntity<SecurityField>>,
}

impl Quote {
    pub fn new(code: &str, last: f64) -> Rc<Self> {
        let symbol = Rc::new(InMemoryEntity::new(code));
        symbol.set(SymbolField::Code, ValueContent::text(code));
        let security = Rc::new(InMemoryEntity::new(code));
        security.set(SecurityField::Last, ValueContent::Number(Some(last)));
        Rc::new(Self { symbol, security })
    }

    pub fn subscribers(&self) -> (usize, usize) {
        (
            self.symbol.subscriber_count(),
            self.security.subscriber_count(),
        )
    }
}

impl RecordItem for Quote {
    fn map_key(&self) -> RecordKey {
        RecordKey::new(self.symbol.key())
    }
}

#[derive(Default)]
pub struct QuoteFactory {
    pub created: Cell<usize>,
    pub on_create: RefCell<Option<Box<dyn Fn()>>>,
}

impl ValueSourceFactory<Quote> for QuoteFactory {
    fn create_value_source(
        &self,
        definition: Rc<FieldSourceDefinition>,
        item: &Rc<Quote>,
    ) -> Box<dyn ValueSource> {
        self.created.set(self.created.get() + 1);
        if let Some(hook) = self.on_create.borrow().as_ref() {
            hook();
        }
        match definition.type_id() {
            FieldSourceTypeId::Symbol => {
                Box::new(EntityValueSource::new(definition, Rc::clone(&item.symbol)))
            }
            FieldSourceTypeId::Security => {
                Box::new(EntityValueSource::new(definition, Rc::clone(&item.security)))
            }
            other => panic!("quotes have no {other} fields"),
        }
    }
}

pub fn quotes(codes: &[&str]) -> Vec<Rc<Quote>> {
    codes
        .iter()
        .enumerate()
        .map(|(position, code)| Quote::new(code, 10.0 + position as f64))
        .collect()
}

pub fn record_events(source: &RecordSource<Quote>) -> Rc<RefCell<Vec<RecordSourceEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    source.subscribe(move |event: &RecordSourceEvent| sink.borrow_mut().push(event.clone()));
    events
}
