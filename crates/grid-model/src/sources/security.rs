use crate::definition::FieldSourceDefinition;
use crate::field::FieldDataType;
use crate::sources::{DomainFieldId, FieldSourceTypeId};

/// Live trading fields of a security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityField {
    Last,
    Open,
    High,
    Low,
    PreviousClose,
    Bid,
    Ask,
    BidCount,
    AskCount,
    Volume,
    Turnover,
    TradingState,
    Halted,
    ShareIssue,
    LastTradeDate,
    SubscriptionDataId,
    Correctness,
}

/// Not exposed as columns: the feed subscription id is plumbing, and
/// correctness is rendered as a cell attribute rather than a column.
const UNSUPPORTED: &[SecurityField] = &[
    SecurityField::SubscriptionDataId,
    SecurityField::Correctness,
];

impl DomainFieldId for SecurityField {
    const ALL: &'static [Self] = &[
        SecurityField::Last,
        SecurityField::Open,
        SecurityField::High,
        SecurityField::Low,
        SecurityField::PreviousClose,
        SecurityField::Bid,
        SecurityField::Ask,
        SecurityField::BidCount,
        SecurityField::AskCount,
        SecurityField::Volume,
        SecurityField::Turnover,
        SecurityField::TradingState,
        SecurityField::Halted,
        SecurityField::ShareIssue,
        SecurityField::LastTradeDate,
        SecurityField::SubscriptionDataId,
        SecurityField::Correctness,
    ];

    fn ordinal(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            SecurityField::Last => "Last",
            SecurityField::Open => "Open",
            SecurityField::High => "High",
            SecurityField::Low => "Low",
            SecurityField::PreviousClose => "PreviousClose",
            SecurityField::Bid => "Bid",
            SecurityField::Ask => "Ask",
            SecurityField::BidCount => "BidCount",
            SecurityField::AskCount => "AskCount",
            SecurityField::Volume => "Volume",
            SecurityField::Turnover => "Turnover",
            SecurityField::TradingState => "TradingState",
            SecurityField::Halted => "Halted",
            SecurityField::ShareIssue => "ShareIssue",
            SecurityField::LastTradeDate => "LastTradeDate",
            SecurityField::SubscriptionDataId => "SubscriptionDataId",
            SecurityField::Correctness => "Correctness",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            SecurityField::Last => "Last",
            SecurityField::Open => "Open",
            SecurityField::High => "High",
            SecurityField::Low => "Low",
            SecurityField::PreviousClose => "Prev Close",
            SecurityField::Bid => "Bid",
            SecurityField::Ask => "Ask",
            SecurityField::BidCount => "Bid #",
            SecurityField::AskCount => "Ask #",
            SecurityField::Volume => "Volume",
            SecurityField::Turnover => "Turnover",
            SecurityField::TradingState => "State",
            SecurityField::Halted => "Halted",
            SecurityField::ShareIssue => "Shares",
            SecurityField::LastTradeDate => "Last Trade",
            SecurityField::SubscriptionDataId => "Subscription",
            SecurityField::Correctness => "Correctness",
        }
    }

    fn data_type(self) -> FieldDataType {
        match self {
            SecurityField::Last
            | SecurityField::Open
            | SecurityField::High
            | SecurityField::Low
            | SecurityField::PreviousClose
            | SecurityField::Bid
            | SecurityField::Ask
            | SecurityField::Turnover => FieldDataType::Number,
            SecurityField::BidCount
            | SecurityField::AskCount
            | SecurityField::Volume
            | SecurityField::ShareIssue => FieldDataType::Integer,
            SecurityField::TradingState | SecurityField::Correctness => FieldDataType::Enumeration,
            SecurityField::Halted => FieldDataType::Boolean,
            SecurityField::LastTradeDate => FieldDataType::Date,
            SecurityField::SubscriptionDataId => FieldDataType::Text,
        }
    }

    fn is_validity(self) -> bool {
        matches!(self, SecurityField::Correctness)
    }
}

pub(crate) fn definition() -> FieldSourceDefinition {
    FieldSourceDefinition::build(
        FieldSourceTypeId::Security,
        UNSUPPORTED,
        &[SecurityField::Last],
    )
}
