//! Value types shared by the world, the entities and the systems

use rand::Rng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Neg};

use crate::config::ItemDef;

// ============================================================================
// Geometry
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// L1 (Manhattan) distance
    pub fn distance(&self, other: Position) -> i32 {
        (other.x - self.x).abs() + (other.y - self.y).abs()
    }

    /// Single-axis unit step from `self` toward `target`.
    ///
    /// With `long_axis` the x axis wins only when `|dx| > |dy|`; without it
    /// the x axis wins when `|dx| <= |dy|`. The two branches tie-break
    /// differently at equal magnitudes and mob motion depends on that.
    pub fn toward(&self, target: Position, long_axis: bool) -> Direction {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        let choose_x = if long_axis {
            dx.abs() > dy.abs()
        } else {
            dx.abs() <= dy.abs()
        };
        if choose_x {
            Direction::new(dx.signum(), 0)
        } else {
            Direction::new(0, dy.signum())
        }
    }

    /// The four orthogonal neighbours
    pub fn neighbours(&self) -> [Position; 4] {
        Direction::ALL.map(|dir| *self + dir)
    }
}

impl Add<Direction> for Position {
    type Output = Position;

    fn add(self, dir: Direction) -> Position {
        Position::new(self.x + dir.dx, self.y + dir.dy)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Grid step. Unit directions have exactly one non-zero axis; `toward` may
/// return the zero step when the target shares the chosen coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Direction {
    pub dx: i32,
    pub dy: i32,
}

impl Direction {
    pub const LEFT: Direction = Direction::new(-1, 0);
    pub const RIGHT: Direction = Direction::new(1, 0);
    pub const UP: Direction = Direction::new(0, -1);
    pub const DOWN: Direction = Direction::new(0, 1);
    pub const ZERO: Direction = Direction::new(0, 0);

    pub const ALL: [Direction; 4] = [Self::LEFT, Self::RIGHT, Self::UP, Self::DOWN];

    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::DOWN
    }
}

impl Neg for Direction {
    type Output = Direction;

    fn neg(self) -> Direction {
        Direction::new(-self.dx, -self.dy)
    }
}

// ============================================================================
// Inventory
// ============================================================================

pub const HEALTH: &str = "health";

/// Named integer counters. Every object carries at least `health`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inventory(BTreeMap<String, i32>);

impl Inventory {
    pub fn with_health(health: i32) -> Self {
        let mut inventory = Self::default();
        inventory.set_health(health);
        inventory
    }

    /// Starting inventory from the item table
    pub fn from_items(items: &BTreeMap<String, ItemDef>) -> Self {
        Self(
            items
                .iter()
                .map(|(name, def)| (name.clone(), def.initial))
                .collect(),
        )
    }

    /// Missing counters read as zero
    pub fn get(&self, name: &str) -> i32 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn set(&mut self, name: &str, amount: i32) {
        match self.0.get_mut(name) {
            Some(slot) => *slot = amount,
            None => {
                self.0.insert(name.to_string(), amount);
            }
        }
    }

    pub fn add(&mut self, name: &str, amount: i32) {
        let current = self.get(name);
        self.set(name, current + amount);
    }

    pub fn health(&self) -> i32 {
        self.get(HEALTH)
    }

    /// Health never goes below zero
    pub fn set_health(&mut self, value: i32) {
        self.set(HEALTH, value.max(0));
    }

    pub fn has_all(&self, needs: &BTreeMap<String, i32>) -> bool {
        needs.iter().all(|(name, amount)| self.get(name) >= *amount)
    }

    pub fn consume(&mut self, uses: &BTreeMap<String, i32>) {
        for (name, amount) in uses {
            self.add(name, -amount);
        }
    }

    /// Clamp every counter into `[0, max]` of its item definition.
    /// Counters without a definition are only floored at zero.
    pub fn clamp(&mut self, items: &BTreeMap<String, ItemDef>) {
        for (name, amount) in self.0.iter_mut() {
            let max = items.get(name).map(|def| def.max).unwrap_or(i32::MAX);
            *amount = (*amount).clamp(0, max);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(name, amount)| (name.as_str(), *amount))
    }
}

// ============================================================================
// Achievements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Achievements(BTreeMap<String, u32>);

impl Achievements {
    pub fn from_names(names: &[String]) -> Self {
        Self(names.iter().map(|name| (name.clone(), 0)).collect())
    }

    pub fn unlock(&mut self, name: &str) {
        match self.0.get_mut(name) {
            Some(count) => *count += 1,
            None => {
                self.0.insert(name.to_string(), 1);
            }
        }
    }

    pub fn count(&self, name: &str) -> u32 {
        self.0.get(name).copied().unwrap_or(0)
    }

    /// Names with a non-zero counter
    pub fn unlocked(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(name, _)| name.as_str())
    }
}

// ============================================================================
// Armor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorTier {
    Iron,
    Diamond,
    Magic,
}

impl ArmorTier {
    /// Damage that gets through this armor
    pub fn absorb(&self, amount: i32) -> i32 {
        match self {
            // 50%, rounded up, at least 1
            ArmorTier::Iron => ((amount + 1) / 2).max(1),
            // 10%, rounded up, at least 1
            ArmorTier::Diamond => ((amount + 9) / 10).max(1),
            // 10%, rounded down, at most 1
            ArmorTier::Magic => (amount / 10).min(1),
        }
    }
}

// ============================================================================
// Day cycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DayCycle {
    pub tick: u64,
}

impl DayCycle {
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Starts in the morning, with long bright days
    pub fn daylight(&self, day_length: u32) -> f32 {
        let progress = self.tick as f64 / day_length.max(1) as f64 + 0.15;
        let daylight = 1.0 - (std::f64::consts::PI * progress).cos().abs().powi(4);
        daylight as f32
    }
}
