//! Strike-indexed market-data book.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use citrine_reactor::{SinkHandle, TypedSink};
use citrine_tree::{OrdinalReduce, RedBlackTree};
use citrine_types::Timestamp;

use crate::error::MarketError;
use crate::events::BboTick;
use crate::option::{Callput, OptionId, OptionStrikeSet};
use crate::price::{Price, PxSize2};

/// Current market data for one option: the last tick and when it arrived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Omd {
    pub tm: Timestamp,
    pub pxz: PxSize2,
}

/// Market data for a call/put pair at one strike.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OmdPair {
    call: Option<Omd>,
    put: Option<Omd>,
}

impl OmdPair {
    pub fn side(&self, cp: Callput) -> Option<&Omd> {
        match cp {
            Callput::Call => self.call.as_ref(),
            Callput::Put => self.put.as_ref(),
        }
    }

    fn side_mut(&mut self, cp: Callput) -> &mut Option<Omd> {
        match cp {
            Callput::Call => &mut self.call,
            Callput::Put => &mut self.put,
        }
    }

    /// Both options at this strike have been quoted.
    pub fn is_complete(&self) -> bool {
        self.call.is_some() && self.put.is_some()
    }
}

/// Consolidated market data for a strike set: collects streaming
/// [`BboTick`]s and maintains the current quote per option, indexed by
/// strike.
///
/// Strikes live in a [`RedBlackTree`] with an ordinal reduction, so the
/// book answers nearest-strike lookups ([`Self::strike_at_or_below`]),
/// order-statistic queries ([`Self::nth_strike`]), and O(log n) range
/// counts ([`Self::strikes_in_range`]) as well as point lookups.
pub struct StrikeSetOmd {
    book: RefCell<RedBlackTree<Price, OmdPair, OrdinalReduce>>,
    /// Tick routing: option id → (strike key, side of the pair).
    routes: BTreeMap<OptionId, (Price, Callput)>,
}

impl StrikeSetOmd {
    /// Builds an (unquoted) book with one slot per strike of `option_set`.
    pub fn new(option_set: &OptionStrikeSet) -> Result<Rc<Self>, MarketError> {
        option_set.verify_ok()?;

        let mut book = RedBlackTree::new();
        let mut routes = BTreeMap::new();

        for pair in option_set.pairs() {
            let strike_px = Price::from_f64(pair.strike());
            book.insert(strike_px, OmdPair::default());
            routes.insert(pair.call().id(), (strike_px, Callput::Call));
            routes.insert(pair.put().id(), (strike_px, Callput::Put));
        }

        Ok(Rc::new(Self {
            book: RefCell::new(book),
            routes,
        }))
    }

    /// Applies one tick. Fails with [`MarketError::UnknownOption`] for ids
    /// outside this book's strike set.
    pub fn notify_bbo(&self, tick: &BboTick) -> Result<(), MarketError> {
        let &(strike_px, cp) = self
            .routes
            .get(&tick.id)
            .ok_or(MarketError::UnknownOption { id: tick.id })?;

        let mut book = self.book.borrow_mut();
        let pair = book
            .get_mut(&strike_px)
            .expect("routed strikes exist in the book");
        *pair.side_mut(cp) = Some(Omd {
            tm: tick.tm,
            pxz: tick.pxz,
        });

        Ok(())
    }

    /// A sink suitable for attaching to a quote stream; unknown options
    /// surface as sink failures.
    pub fn bbo_sink(self: &Rc<Self>) -> SinkHandle<BboTick> {
        let book = Rc::clone(self);
        TypedSink::new(move |tick: &BboTick| {
            book.notify_bbo(tick)
                .map_err(|e| citrine_reactor::SinkError::new(e.to_string()))
        })
    }

    /// Current market data for one option, if it has been quoted.
    pub fn lookup(&self, id: OptionId) -> Option<Omd> {
        let &(strike_px, cp) = self.routes.get(&id)?;
        self.book
            .borrow()
            .get(&strike_px)
            .and_then(|pair| pair.side(cp).copied())
    }

    pub fn pair_at(&self, strike_px: Price) -> Option<OmdPair> {
        self.book.borrow().get(&strike_px).copied()
    }

    pub fn n_strike(&self) -> usize {
        self.book.borrow().len()
    }

    /// Number of strikes in the half-open price range `[lo, hi)`.
    pub fn strikes_in_range(&self, lo: Price, hi: Price) -> usize {
        self.book.borrow().fold_range(&lo, &hi)
    }

    /// Greatest strike at or below `px`.
    pub fn strike_at_or_below(&self, px: Price) -> Option<Price> {
        self.book.borrow().glb(&px, true).map(|(k, _)| *k)
    }

    /// Least strike at or above `px`.
    pub fn strike_at_or_above(&self, px: Price) -> Option<Price> {
        self.book.borrow().lub(&px, true).map(|(k, _)| *k)
    }

    /// `i`-th lowest strike.
    pub fn nth_strike(&self, i: usize) -> Option<Price> {
        self.book.borrow().nth(i).map(|(k, _)| *k)
    }

    /// Strikes where both sides of the pair have been quoted.
    pub fn complete_strikes(&self) -> Vec<Price> {
        self.book
            .borrow()
            .iter()
            .filter(|(_, pair)| pair.is_complete())
            .map(|(k, _)| *k)
            .collect()
    }
}

impl std::fmt::Debug for StrikeSetOmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrikeSetOmd")
            .field("n_strike", &self.n_strike())
            .field("n_option", &self.routes.len())
            .finish()
    }
}
