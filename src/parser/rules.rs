//! Packed rule-table format for the table-driven parser VM (spec.md §4.5.1–4.5.3).
//!
//! A rule table maps `(state, class)` to a single byte packing `(op,
//! next_state)`: the low 5 bits are the next state (so at most 32
//! states), the high 3 bits select one of 8 ops (only 5 are defined).
//! The ordering of op codes is deliberately contiguous, so a `match`
//! over `Op` compiles to a dense jump table even without the source's
//! computed-goto dispatch (spec.md §9).

/// What to do with the current byte when a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// Keep building the current token; continue.
    NoSplit = 0,
    /// Finish the current token before this byte; this byte starts the next token.
    SplitBefore = 1,
    /// Finish the current token including this byte.
    SplitAfter = 2,
    /// Finish the current token before this byte; discard this byte.
    SplitSkip = 3,
    /// Parse error.
    Err = 7,
}

impl Op {
    fn from_bits(bits: u8) -> Option<Op> {
        match bits {
            0 => Some(Op::NoSplit),
            1 => Some(Op::SplitBefore),
            2 => Some(Op::SplitAfter),
            3 => Some(Op::SplitSkip),
            7 => Some(Op::Err),
            _ => None,
        }
    }
}

const STATE_BITS: u8 = 5;
const STATE_MASK: u8 = (1 << STATE_BITS) - 1;

/// Maximum number of states a rule table can address (5-bit field).
pub const MAX_STATES: usize = 1 << STATE_BITS;

fn pack(op: Op, next_state: usize) -> u8 {
    debug_assert!(next_state < MAX_STATES, "next_state {next_state} overflows 5 bits");
    ((op as u8) << STATE_BITS) | (next_state as u8 & STATE_MASK)
}

fn unpack(entry: u8) -> (Option<Op>, usize) {
    (Op::from_bits(entry >> STATE_BITS), (entry & STATE_MASK) as usize)
}

/// A classifier maps an input byte to a class index in `0..nclasses`.
pub type Classifier = fn(u8) -> usize;

/// A parser ruleset: the packed FSM table plus its shape and classifier
/// (spec.md §4.5.1, mirroring `struct parser_rules`).
#[derive(Clone)]
pub struct Rules {
    entries: Vec<u8>,
    pub nstates: usize,
    pub nclasses: usize,
    pub init_state: usize,
    pub fin_state: usize,
    pub classify: Classifier,
}

impl Rules {
    /// A fresh ruleset with every entry defaulted to `(Err, fin_state)`,
    /// matching the source's own convention of painting every entry as an
    /// error before carving out the real transitions.
    pub fn new(nstates: usize, nclasses: usize, init_state: usize, fin_state: usize, classify: Classifier) -> Self {
        assert!(nstates <= MAX_STATES, "nstates {nstates} exceeds MAX_STATES");
        let mut rules = Rules { entries: vec![0; nstates * nclasses], nstates, nclasses, init_state, fin_state, classify };
        rules.set_all_op_target(Op::Err, fin_state);
        rules
    }

    fn index(&self, state: usize, class: usize) -> usize {
        state * self.nclasses + class
    }

    pub fn entry(&self, state: usize, class: usize) -> (Option<Op>, usize) {
        unpack(self.entries[self.index(state, class)])
    }

    pub fn set_entry(&mut self, state: usize, class: usize, op: Op, next_state: usize) {
        let idx = self.index(state, class);
        self.entries[idx] = pack(op, next_state);
    }

    pub fn set_op(&mut self, state: usize, class: usize, op: Op) {
        let (_, next_state) = self.entry(state, class);
        self.set_entry(state, class, op, next_state);
    }

    pub fn set_target(&mut self, state: usize, class: usize, next_state: usize) {
        let (op, _) = self.entry(state, class);
        self.set_entry(state, class, op.unwrap_or(Op::Err), next_state);
    }

    /// Set `(op, next_state)` for every `(state, class)` pair.
    pub fn set_all_op_target(&mut self, op: Op, next_state: usize) {
        for state in 0..self.nstates {
            for class in 0..self.nclasses {
                self.set_entry(state, class, op, next_state);
            }
        }
    }

    /// Set `(op, next_state)` for every class of one state.
    pub fn set_state_op_target(&mut self, state: usize, op: Op, next_state: usize) {
        for class in 0..self.nclasses {
            self.set_entry(state, class, op, next_state);
        }
    }

    /// Set `(op, next_state)` for one class across every state.
    pub fn set_global_op_target(&mut self, class: usize, op: Op, next_state: usize) {
        for state in 0..self.nstates {
            self.set_entry(state, class, op, next_state);
        }
    }

    pub fn set_global_target(&mut self, class: usize, next_state: usize) {
        for state in 0..self.nstates {
            self.set_target(state, class, next_state);
        }
    }

    pub fn set_global_op(&mut self, class: usize, op: Op) {
        for state in 0..self.nstates {
            self.set_op(state, class, op);
        }
    }

    /// Set `(op, next_state)` for `state` across the given list of classes
    /// (spec.md §4.5.2 "variadic lists of (state, class) pairs").
    pub fn set_list_op_target(&mut self, state: usize, op: Op, next_state: usize, classes: &[usize]) {
        for &class in classes {
            self.set_entry(state, class, op, next_state);
        }
    }

    /// Set `(op, next_state)` for `class` across the given list of states.
    pub fn list_set_op_target(&mut self, class: usize, op: Op, next_state: usize, states: &[usize]) {
        for &state in states {
            self.set_entry(state, class, op, next_state);
        }
    }

    /// Validate the ruleset's structural invariants (spec.md §4.5.3).
    pub fn validate(&self) -> Result<(), String> {
        if self.init_state >= self.nstates {
            return Err(format!("init_state {} >= nstates {}", self.init_state, self.nstates));
        }
        let mut reaches_fin = false;
        for state in 0..self.nstates {
            for class in 0..self.nclasses {
                let (op, next_state) = self.entry(state, class);
                if op.is_none() {
                    return Err(format!("entry ({state},{class}) has an undefined op"));
                }
                if next_state != self.fin_state && next_state >= self.nstates {
                    return Err(format!("entry ({state},{class}) targets invalid state {next_state}"));
                }
                if next_state == self.fin_state {
                    reaches_fin = true;
                }
            }
        }
        if !reaches_fin {
            return Err("no entry transitions to fin_state".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trivial_classifier(_b: u8) -> usize {
        0
    }

    #[test]
    fn pack_unpack_roundtrips() {
        for op in [Op::NoSplit, Op::SplitBefore, Op::SplitAfter, Op::SplitSkip, Op::Err] {
            for state in [0usize, 1, 17, 31] {
                let byte = pack(op, state);
                let (back_op, back_state) = unpack(byte);
                assert_eq!(back_op, Some(op));
                assert_eq!(back_state, state);
            }
        }
    }

    #[test]
    fn new_defaults_every_entry_to_err_fin() {
        let r = Rules::new(3, 2, 0, 3, trivial_classifier);
        for state in 0..3 {
            for class in 0..2 {
                assert_eq!(r.entry(state, class), (Some(Op::Err), 3));
            }
        }
    }

    #[test]
    fn set_global_and_state_setters_compose() {
        let mut r = Rules::new(2, 2, 0, 2, trivial_classifier);
        r.set_global_op_target(0, Op::NoSplit, 0);
        r.set_state_op_target(1, Op::SplitAfter, 2);
        assert_eq!(r.entry(0, 0), (Some(Op::NoSplit), 0));
        assert_eq!(r.entry(1, 0), (Some(Op::SplitAfter), 2));
        assert_eq!(r.entry(1, 1), (Some(Op::SplitAfter), 2));
    }

    #[test]
    fn validate_rejects_bad_init_state() {
        let r = Rules::new(2, 1, 5, 2, trivial_classifier);
        assert!(r.validate().is_err());
    }

    #[test]
    fn validate_rejects_unreachable_fin() {
        let mut r = Rules::new(2, 1, 0, 2, trivial_classifier);
        r.set_all_op_target(Op::NoSplit, 0);
        assert!(r.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_table() {
        let mut r = Rules::new(2, 1, 0, 2, trivial_classifier);
        r.set_global_op_target(0, Op::SplitBefore, 2);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn list_setters_touch_exactly_the_listed_entries() {
        let mut r = Rules::new(3, 3, 0, 3, trivial_classifier);
        r.set_list_op_target(0, Op::NoSplit, 1, &[0, 2]);
        assert_eq!(r.entry(0, 0), (Some(Op::NoSplit), 1));
        assert_eq!(r.entry(0, 2), (Some(Op::NoSplit), 1));
        assert_eq!(r.entry(0, 1), (Some(Op::Err), 3));
    }
}
