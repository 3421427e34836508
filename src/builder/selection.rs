//! UTXO coin selection
//!
//! Depth-first branch-and-bound over unspents sorted by descending value.
//! Each visited node evaluates a destination + change variant and a
//! destination-only variant; the first node that yields a variant closes its
//! branch. Among all variants the smallest transaction wins, then the one
//! with less change.

use crate::error::EngineError;
use crate::serializer::script::ScriptType;

pub const DEFAULT_MAX_INPUTS: usize = 1000;
pub const DEFAULT_MAX_TRIES: usize = 100_000;

/// Fixed transaction overhead: version, counts, locktime
const TX_OVERHEAD_VBYTES: u64 = 10;
/// Marker and flag, rounded up
const SEGWIT_OVERHEAD_VBYTES: u64 = 1;

/// How the fee of a candidate is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeMode {
    /// `size × rate` sat/vbyte
    Calculate(u64),
    /// A fee fixed by the caller, in satoshis
    Exactly(u64),
}

impl FeeMode {
    pub fn is_calculation(&self) -> bool {
        matches!(self, FeeMode::Calculate(_))
    }

    fn fee_for(&self, size: u64) -> Result<i64, SelectionError> {
        let fee = match self {
            FeeMode::Calculate(rate) => size.checked_mul(*rate),
            FeeMode::Exactly(fee) => Some(*fee),
        };
        fee.and_then(|fee| i64::try_from(fee).ok())
            .ok_or(SelectionError::FeeOverflow)
    }
}

/// An unspent as seen by the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionInput {
    /// Position in the caller's unspent list
    pub position: usize,
    pub amount: u64,
    pub script_type: ScriptType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTarget {
    pub amount: u64,
    pub destination: ScriptType,
    pub change: ScriptType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    pub max_inputs: usize,
    pub max_tries: usize,
    /// Network-wide dust floor, applied on top of the per-script threshold
    pub dust_threshold: u64,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            max_inputs: DEFAULT_MAX_INPUTS,
            max_tries: DEFAULT_MAX_TRIES,
            dust_threshold: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    WrongAmount,
    DustAmount { amount: u64, dust: u64 },
    NoOutputs,
    InsufficientFunds { required: u64, available: u64 },
    UnableToFindSuitableUtxos,
    UnsupportedScript(ScriptType),
    /// `size × rate` does not fit the satoshi range
    FeeOverflow,
    /// Unspent values add up past the satoshi range
    AmountOverflow,
}

impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionError::WrongAmount => write!(f, "amount must be greater than zero"),
            SelectionError::DustAmount { amount, dust } => {
                write!(f, "amount {} is below the dust threshold {}", amount, dust)
            }
            SelectionError::NoOutputs => write!(f, "no unspent outputs"),
            SelectionError::InsufficientFunds { required, available } => write!(
                f,
                "insufficient funds: need {}, have {}",
                required, available
            ),
            SelectionError::UnableToFindSuitableUtxos => {
                write!(f, "unable to find a suitable set of unspent outputs")
            }
            SelectionError::UnsupportedScript(script) => {
                write!(f, "cannot estimate the size of a {:?} input", script)
            }
            SelectionError::FeeOverflow => write!(f, "fee rate is too large for the transaction size"),
            SelectionError::AmountOverflow => write!(f, "unspent amounts overflow the satoshi range"),
        }
    }
}

impl From<SelectionError> for EngineError {
    fn from(e: SelectionError) -> Self {
        EngineError::invalid_request(e.to_string())
    }
}

/// Winning variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Chosen inputs in the caller's original order
    pub inputs: Vec<SelectionInput>,
    pub destination: u64,
    /// Negative only for a fee estimate that spends everything
    pub change: i64,
    pub fee: u64,
    pub size: u64,
    /// Whether a change output is part of the size estimate
    pub has_change_output: bool,
}

impl Selection {
    fn better_than(&self, other: &Selection) -> bool {
        self.size < other.size || (self.size == other.size && self.change < other.change)
    }

    /// Sum of the chosen inputs; `None` on overflow
    pub fn input_total(&self) -> Option<u64> {
        checked_total(&self.inputs)
    }
}

fn checked_total(inputs: &[SelectionInput]) -> Option<u64> {
    inputs
        .iter()
        .try_fold(0u64, |acc, input| acc.checked_add(input.amount))
        .filter(|total| i64::try_from(*total).is_ok())
}

/// Estimated virtual size of a transaction
pub fn transaction_size(inputs: &[ScriptType], outputs: &[ScriptType]) -> Result<u64, SelectionError> {
    let mut size = TX_OVERHEAD_VBYTES;
    if inputs.iter().any(|s| s.is_segwit()) {
        size += SEGWIT_OVERHEAD_VBYTES;
    }
    for input in inputs {
        size += input
            .input_vsize()
            .ok_or(SelectionError::UnsupportedScript(*input))?;
    }
    size += outputs.iter().map(|s| s.output_size()).sum::<u64>();
    Ok(size)
}

#[derive(Debug, Clone)]
struct State {
    selected: Vec<usize>,
    index: usize,
    remaining: i64,
    current: i64,
}

pub struct CoinSelector {
    limits: SelectionLimits,
}

impl CoinSelector {
    pub fn new(limits: SelectionLimits) -> Self {
        Self { limits }
    }

    fn dust(&self, script: ScriptType) -> u64 {
        script.dust_threshold().max(self.limits.dust_threshold)
    }

    pub fn select(
        &self,
        unspents: &[SelectionInput],
        target: SelectionTarget,
        fee: FeeMode,
    ) -> Result<Selection, SelectionError> {
        if target.amount == 0 {
            return Err(SelectionError::WrongAmount);
        }
        let dust = self.dust(target.destination);
        if !fee.is_calculation() && target.amount < dust {
            return Err(SelectionError::DustAmount {
                amount: target.amount,
                dust,
            });
        }
        if unspents.is_empty() {
            return Err(SelectionError::NoOutputs);
        }
        let total = checked_total(unspents).ok_or(SelectionError::AmountOverflow)?;
        if target.amount > total {
            return Err(SelectionError::InsufficientFunds {
                required: target.amount,
                available: total,
            });
        }

        let mut sorted = unspents.to_vec();
        sorted.sort_by(|a, b| b.amount.cmp(&a.amount));

        let context = Context {
            target,
            fee,
            total_count: unspents.len(),
            change_dust: self.dust(target.change),
        };

        let best = if sorted.len() > self.limits.max_inputs {
            tracing::debug!(inputs = sorted.len(), "too many inputs, using largest-first selection");
            self.largest_first(&context, &sorted)?
        } else {
            self.branch_and_bound(&context, &sorted, total)?
        };

        let mut best = best.ok_or(SelectionError::UnableToFindSuitableUtxos)?;
        if best.inputs.is_empty() {
            return Err(SelectionError::UnableToFindSuitableUtxos);
        }
        best.inputs.sort_by_key(|i| i.position);
        Ok(best)
    }

    // `total` is known to fit i64, so every partial sum below does too
    fn branch_and_bound(
        &self,
        context: &Context,
        inputs: &[SelectionInput],
        total: u64,
    ) -> Result<Option<Selection>, SelectionError> {
        let mut best: Option<Selection> = None;
        let mut tries = 0usize;
        let mut stack = vec![State {
            selected: Vec::new(),
            index: 0,
            remaining: total as i64,
            current: 0,
        }];

        while let Some(state) = stack.pop() {
            tries += 1;
            if tries >= self.limits.max_tries {
                tracing::debug!(tries, "stopping selection at the try limit");
                break;
            }

            let selected: Vec<SelectionInput> = state.selected.iter().map(|i| inputs[*i]).collect();
            if let Some(variant) = context.best_variant(&selected, state.current)? {
                if best.as_ref().map_or(true, |b| variant.better_than(b)) {
                    best = Some(variant);
                }
                continue;
            }

            if state.index >= inputs.len() {
                continue;
            }
            if state.current + state.remaining < context.target.amount as i64 {
                continue;
            }

            let amount = inputs[state.index].amount as i64;
            // exclude is pushed first so the include branch is explored first
            stack.push(State {
                selected: state.selected.clone(),
                index: state.index + 1,
                remaining: state.remaining - amount,
                current: state.current,
            });
            let mut selected = state.selected;
            selected.push(state.index);
            stack.push(State {
                selected,
                index: state.index + 1,
                remaining: state.remaining,
                current: state.current + amount,
            });
        }

        Ok(best)
    }

    fn largest_first(
        &self,
        context: &Context,
        inputs: &[SelectionInput],
    ) -> Result<Option<Selection>, SelectionError> {
        let mut sum = 0i64;
        for (count, input) in inputs.iter().enumerate() {
            sum += input.amount as i64;
            if sum >= context.target.amount as i64 {
                return context.best_variant(&inputs[..=count], sum);
            }
        }
        Ok(None)
    }
}

impl Default for CoinSelector {
    fn default() -> Self {
        Self::new(SelectionLimits::default())
    }
}

struct Context {
    target: SelectionTarget,
    fee: FeeMode,
    total_count: usize,
    change_dust: u64,
}

impl Context {
    fn best_variant(
        &self,
        inputs: &[SelectionInput],
        current: i64,
    ) -> Result<Option<Selection>, SelectionError> {
        let two = self.with_change(inputs, current)?;
        let single = self.without_change(inputs, current)?;
        Ok(match (two, single) {
            (Some(a), Some(b)) => Some(if b.better_than(&a) { b } else { a }),
            (a, b) => a.or(b),
        })
    }

    fn spends_everything(&self, inputs: &[SelectionInput]) -> bool {
        self.fee.is_calculation() && inputs.len() == self.total_count
    }

    fn size(&self, inputs: &[SelectionInput], outputs: &[ScriptType]) -> Option<u64> {
        let scripts: Vec<ScriptType> = inputs.iter().map(|i| i.script_type).collect();
        transaction_size(&scripts, outputs).ok()
    }

    fn with_change(
        &self,
        inputs: &[SelectionInput],
        current: i64,
    ) -> Result<Option<Selection>, SelectionError> {
        let amount = self.target.amount as i64;
        if current < amount {
            return Ok(None);
        }
        let Some(size) = self.size(inputs, &[self.target.change, self.target.destination]) else {
            return Ok(None);
        };
        let fee = self.fee.fee_for(size)?;
        let mut change = current - amount;
        if change < fee {
            return Ok(None);
        }
        change -= fee;

        if !self.spends_everything(inputs) && change != 0 && change < self.change_dust as i64 {
            return Ok(None);
        }
        // zero change means the change output is never written
        let size = if change > 0 {
            size
        } else {
            match self.size(inputs, &[self.target.destination]) {
                Some(size) => size,
                None => return Ok(None),
            }
        };
        Ok(Some(Selection {
            inputs: inputs.to_vec(),
            destination: self.target.amount,
            change,
            fee: fee as u64,
            size,
            has_change_output: change > 0,
        }))
    }

    fn without_change(
        &self,
        inputs: &[SelectionInput],
        current: i64,
    ) -> Result<Option<Selection>, SelectionError> {
        let amount = self.target.amount as i64;
        if current < amount {
            return Ok(None);
        }
        let Some(size) = self.size(inputs, &[self.target.destination]) else {
            return Ok(None);
        };
        let fee = self.fee.fee_for(size)?;
        let mut change = current - amount;

        if self.spends_everything(inputs) {
            change -= fee;
            if change > 0 {
                return Ok(None);
            }
        } else {
            if change > fee {
                return Ok(None);
            }
            change -= fee;
            if change != 0 {
                return Ok(None);
            }
        }
        Ok(Some(Selection {
            inputs: inputs.to_vec(),
            destination: self.target.amount,
            change,
            fee: fee as u64,
            size,
            has_change_output: false,
        }))
    }
}
