//! Spatial world
//!
//! Owns the three coupled indices: the material grid, the occupant grid and
//! the chunk partition, plus the append-only entity table. The methods here
//! are the only way to mutate them. Between any two calls, for every live
//! entity `e`: `occupants[e.pos] == e.id` and `e.id` is a member of exactly
//! the chunk `chunk_key(e.pos)`.

use std::collections::{BTreeSet, HashMap};
use tracing::warn;

use crate::components::{Direction, Position};
use crate::config::{GameConfig, MaterialSet};
use crate::entity::{EntityId, Kind, Object};
use crate::error::WorldError;

// ============================================================================
// Materials
// ============================================================================

/// Palette index. 0 is reserved for "no material".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MaterialId(pub u16);

impl MaterialId {
    pub const NONE: MaterialId = MaterialId(0);
}

/// Open palette: names register on first write
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Palette {
    names: Vec<String>,
    ids: HashMap<String, MaterialId>,
}

impl Palette {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut palette = Self {
            names: vec![String::new()],
            ids: HashMap::new(),
        };
        for name in names {
            if let Err(err) = palette.register(name) {
                warn!(%err, "material table truncated");
                break;
            }
        }
        palette
    }

    /// Id for `name`, assigning the next free one to an unseen name
    pub fn register(&mut self, name: &str) -> Result<MaterialId, WorldError> {
        if let Some(id) = self.ids.get(name) {
            return Ok(*id);
        }
        let next = u16::try_from(self.names.len()).map_err(|_| WorldError::PaletteFull {
            name: name.to_string(),
        })?;
        let id = MaterialId(next);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<MaterialId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: MaterialId) -> Option<&str> {
        if id == MaterialId::NONE {
            return None;
        }
        self.names.get(id.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Regions
// ============================================================================

/// Half-open rectangle `[xmin, xmax) x [ymin, ymax)`. Chunk keys are rects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rect {
    pub xmin: i32,
    pub xmax: i32,
    pub ymin: i32,
    pub ymax: i32,
}

impl Rect {
    pub fn width(&self) -> usize {
        (self.xmax - self.xmin).max(0) as usize
    }

    pub fn height(&self) -> usize {
        (self.ymax - self.ymin).max(0) as usize
    }

    pub fn contains(&self, pos: Position) -> bool {
        (self.xmin..self.xmax).contains(&pos.x) && (self.ymin..self.ymax).contains(&pos.y)
    }

    /// Cells in x-major order
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (self.xmin..self.xmax).flat_map(move |x| (self.ymin..self.ymax).map(move |y| Position::new(x, y)))
    }
}

/// Boolean submatrix over a rect, x-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pub rect: Rect,
    cells: Vec<bool>,
}

impl Mask {
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|hit| **hit).count()
    }

    pub fn get(&self, pos: Position) -> bool {
        if !self.rect.contains(pos) {
            return false;
        }
        let dx = (pos.x - self.rect.xmin) as usize;
        let dy = (pos.y - self.rect.ymin) as usize;
        self.cells[dx * self.rect.height() + dy]
    }

    /// Cell-wise OR with a mask over the same rect
    pub fn union(&mut self, other: &Mask) {
        debug_assert_eq!(self.rect, other.rect);
        for (mine, theirs) in self.cells.iter_mut().zip(&other.cells) {
            *mine |= *theirs;
        }
    }

    /// Positions of the set cells, x-major
    pub fn positions(&self) -> Vec<Position> {
        self.rect
            .cells()
            .zip(&self.cells)
            .filter(|(_, hit)| **hit)
            .map(|(pos, _)| pos)
            .collect()
    }
}

/// Result of a `nearby` query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Nearby {
    pub materials: BTreeSet<String>,
    pub occupants: BTreeSet<EntityId>,
}

/// One cell as seen by gameplay code. Out-of-bounds reads give the empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub material: MaterialId,
    pub occupant: Option<EntityId>,
}

// ============================================================================
// World
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SpatialWorld {
    width: u32,
    height: u32,
    chunk_width: u32,
    chunk_height: u32,
    palette: Palette,
    materials: Vec<MaterialId>,
    occupants: Vec<u32>,
    /// Slot 0 is the sentinel; removed entities stay as tombstones
    objects: Vec<Option<Object>>,
    chunks: Vec<BTreeSet<EntityId>>,
    pub daylight: f32,
}

impl SpatialWorld {
    pub fn new<'a>(
        area: (u32, u32),
        chunk_size: (u32, u32),
        materials: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let (width, height) = area;
        let (chunk_width, chunk_height) = (chunk_size.0.max(1), chunk_size.1.max(1));
        let cells = width as usize * height as usize;
        let chunk_count = width.div_ceil(chunk_width) as usize * height.div_ceil(chunk_height) as usize;
        Self {
            width,
            height,
            chunk_width,
            chunk_height,
            palette: Palette::new(materials),
            materials: vec![MaterialId::NONE; cells],
            occupants: vec![0; cells],
            objects: vec![None],
            chunks: vec![BTreeSet::new(); chunk_count],
            daylight: 0.0,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        let w = &config.world;
        Self::new(
            (w.width, w.height),
            (w.chunk_width, w.chunk_height),
            config.materials.iter().map(|m| m.name.as_str()),
        )
    }

    /// Clear both grids, the chunk sets and the entity table. The palette
    /// keeps its registrations so material ids stay stable across episodes.
    pub fn reset(&mut self) {
        self.materials.fill(MaterialId::NONE);
        self.occupants.fill(0);
        self.objects.clear();
        self.objects.push(None);
        for chunk in &mut self.chunks {
            chunk.clear();
        }
        self.daylight = 0.0;
    }

    pub fn area(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos)
            .then(|| pos.x as usize * self.height as usize + pos.y as usize)
    }

    // ------------------------------------------------------------------
    // Entity table
    // ------------------------------------------------------------------

    /// Insert an object at its position. The target cell must be empty.
    pub fn add(&mut self, mut object: Object) -> Result<EntityId, WorldError> {
        let pos = object.pos;
        let index = self.index(pos).ok_or(WorldError::OutOfBounds { pos })?;
        if let Some(occupant) = self.occupant_id(index) {
            warn!(%pos, %occupant, "add onto occupied cell");
            return Err(WorldError::Occupied { pos, occupant });
        }
        let id = EntityId(self.objects.len() as u32);
        object.id = id;
        object.removed = false;
        self.occupants[index] = id.0;
        let chunk = self.chunk_index(pos);
        self.chunks[chunk].insert(id);
        self.objects.push(Some(object));
        Ok(id)
    }

    /// Tombstone an entity. Removing twice is a no-op; returns whether this
    /// call removed anything.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let pos = match self.live(id) {
            Some(object) => object.pos,
            None => return false,
        };
        if let Some(index) = self.index(pos) {
            self.occupants[index] = 0;
        }
        let chunk = self.chunk_index(pos);
        self.chunks[chunk].remove(&id);
        if let Some(object) = self.object_mut(id) {
            object.removed = true;
        }
        true
    }

    /// Relocate an entity. Moving a removed entity is a no-op; the
    /// destination must be in bounds and empty.
    pub fn move_entity(&mut self, id: EntityId, pos: Position) -> Result<(), WorldError> {
        let from = match self.object(id) {
            None => return Err(WorldError::UnknownEntity(id)),
            Some(object) if object.removed => return Ok(()),
            Some(object) => object.pos,
        };
        let to_index = self.index(pos).ok_or(WorldError::OutOfBounds { pos })?;
        if let Some(occupant) = self.occupant_id(to_index) {
            warn!(%id, %pos, %occupant, "move onto occupied cell");
            return Err(WorldError::Occupied { pos, occupant });
        }
        if let Some(from_index) = self.index(from) {
            self.occupants[from_index] = 0;
        }
        self.occupants[to_index] = id.0;
        let (old_chunk, new_chunk) = (self.chunk_index(from), self.chunk_index(pos));
        if old_chunk != new_chunk {
            self.chunks[old_chunk].remove(&id);
            self.chunks[new_chunk].insert(id);
        }
        if let Some(object) = self.object_mut(id) {
            object.pos = pos;
        }
        Ok(())
    }

    /// Any slot ever assigned, including tombstones
    pub fn object(&self, id: EntityId) -> Option<&Object> {
        self.objects.get(id.index()).and_then(Option::as_ref)
    }

    pub fn object_mut(&mut self, id: EntityId) -> Option<&mut Object> {
        self.objects.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Only entities that have not been removed
    pub fn live(&self, id: EntityId) -> Option<&Object> {
        self.object(id).filter(|object| !object.removed)
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.live(id).is_some()
    }

    /// Live entities in slot order
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter().flatten().filter(|object| !object.removed)
    }

    pub fn live_ids(&self) -> Vec<EntityId> {
        self.objects().map(|object| object.id).collect()
    }

    /// Number of slots handed out, tombstones included
    pub fn slots(&self) -> usize {
        self.objects.len() - 1
    }

    /// Write back a variant's state after its update
    pub fn set_kind(&mut self, id: EntityId, kind: Kind) {
        if let Some(object) = self.object_mut(id) {
            object.kind = kind;
        }
    }

    pub fn take_damage(&mut self, id: EntityId, amount: i32) {
        if let Some(object) = self.object_mut(id).filter(|object| !object.removed) {
            object.take_damage(amount);
        }
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    fn occupant_id(&self, index: usize) -> Option<EntityId> {
        match self.occupants[index] {
            0 => None,
            slot => Some(EntityId(slot)),
        }
    }

    /// Write a material, registering unseen names
    pub fn set_material(&mut self, pos: Position, name: &str) -> Result<(), WorldError> {
        let index = self.index(pos).ok_or(WorldError::OutOfBounds { pos })?;
        let id = self.palette.register(name)?;
        self.materials[index] = id;
        Ok(())
    }

    pub fn get_cell(&self, pos: Position) -> Cell {
        match self.index(pos) {
            Some(index) => Cell {
                material: self.materials[index],
                occupant: self.occupant_id(index),
            },
            None => Cell::default(),
        }
    }

    pub fn material_at(&self, pos: Position) -> Option<&str> {
        self.palette.name(self.get_cell(pos).material)
    }

    pub fn occupant_at(&self, pos: Position) -> Option<EntityId> {
        self.get_cell(pos).occupant
    }

    /// True when the cell is unoccupied and holds one of `materials`
    pub fn is_free(&self, pos: Position, materials: &MaterialSet) -> bool {
        let cell = self.get_cell(pos);
        cell.occupant.is_none()
            && self
                .palette
                .name(cell.material)
                .is_some_and(|name| materials.contains(name))
    }

    /// Step an entity one cell. Fails (without error) when the target is out
    /// of bounds, occupied, or not walkable for this entity.
    pub fn try_move(&mut self, id: EntityId, dir: Direction, config: &GameConfig) -> bool {
        let (target, free) = match self.live(id) {
            Some(object) => {
                let target = object.pos + dir;
                (target, self.is_free(target, object.walkable(config)))
            }
            None => return false,
        };
        free && self.move_entity(id, target).is_ok()
    }

    /// Materials and occupants in the square of side `2 * radius + 1`
    /// centred on `pos`, clipped to the world.
    pub fn nearby(&self, pos: Position, radius: i32) -> Nearby {
        let mut nearby = Nearby::default();
        for x in (pos.x - radius)..=(pos.x + radius) {
            for y in (pos.y - radius)..=(pos.y + radius) {
                let cell = self.get_cell(Position::new(x, y));
                if let Some(name) = self.palette.name(cell.material) {
                    nearby.materials.insert(name.to_string());
                }
                if let Some(occupant) = cell.occupant {
                    nearby.occupants.insert(occupant);
                }
            }
        }
        nearby
    }

    /// Cells of `rect` holding `material`. Unknown names match nothing.
    pub fn mask_material(&self, rect: Rect, material: &str) -> Mask {
        let id = self.palette.id(material);
        let cells = rect
            .cells()
            .map(|pos| {
                let cell = self.get_cell(pos);
                id.is_some_and(|id| cell.material == id)
            })
            .collect();
        Mask { rect, cells }
    }

    pub fn count_material(&self, material: &str) -> usize {
        match self.palette.id(material) {
            Some(id) => self.materials.iter().filter(|m| **m == id).count(),
            None => 0,
        }
    }

    pub fn material_grid(&self) -> &[MaterialId] {
        &self.materials
    }

    // ------------------------------------------------------------------
    // Chunks
    // ------------------------------------------------------------------

    /// Chunk rect owning `pos`, clipped at the world edges
    pub fn chunk_key(&self, pos: Position) -> Rect {
        let (cw, ch) = (self.chunk_width as i32, self.chunk_height as i32);
        let xmin = pos.x.div_euclid(cw) * cw;
        let ymin = pos.y.div_euclid(ch) * ch;
        Rect {
            xmin,
            xmax: (xmin + cw).min(self.width as i32),
            ymin,
            ymax: (ymin + ch).min(self.height as i32),
        }
    }

    fn chunk_rows(&self) -> usize {
        self.height.div_ceil(self.chunk_height) as usize
    }

    fn chunk_index(&self, pos: Position) -> usize {
        let col = (pos.x.max(0) as u32 / self.chunk_width) as usize;
        let row = (pos.y.max(0) as u32 / self.chunk_height) as usize;
        col * self.chunk_rows() + row
    }

    /// Every chunk rect, x-major
    pub fn chunk_keys(&self) -> Vec<Rect> {
        let (cw, ch) = (self.chunk_width as i32, self.chunk_height as i32);
        let mut keys = Vec::with_capacity(self.chunks.len());
        for xmin in (0..self.width as i32).step_by(cw as usize) {
            for ymin in (0..self.height as i32).step_by(ch as usize) {
                keys.push(self.chunk_key(Position::new(xmin, ymin)));
            }
        }
        keys
    }

    /// Live entities positioned inside the chunk `key`
    pub fn chunk_members(&self, key: Rect) -> &BTreeSet<EntityId> {
        &self.chunks[self.chunk_index(Position::new(key.xmin, key.ymin))]
    }

    // ------------------------------------------------------------------
    // Checking
    // ------------------------------------------------------------------

    /// Verify the grid/chunk invariant for every entity
    pub fn verify(&self) -> Result<(), WorldError> {
        for object in self.objects.iter().flatten() {
            let id = object.id;
            let member_of = self.chunks.iter().filter(|chunk| chunk.contains(&id)).count();
            if object.removed {
                if member_of != 0 {
                    return Err(WorldError::Invariant { id, reason: "tombstone still in a chunk" });
                }
                continue;
            }
            if self.occupant_at(object.pos) != Some(id) {
                return Err(WorldError::Invariant { id, reason: "occupant grid does not point at entity" });
            }
            if member_of != 1 || !self.chunk_members(self.chunk_key(object.pos)).contains(&id) {
                return Err(WorldError::Invariant { id, reason: "entity not in exactly its own chunk" });
            }
        }
        for (index, slot) in self.occupants.iter().enumerate() {
            if *slot == 0 {
                continue;
            }
            let id = EntityId(*slot);
            let pos = Position::new(
                (index / self.height as usize) as i32,
                (index % self.height as usize) as i32,
            );
            match self.live(id) {
                Some(object) if object.pos == pos => {}
                _ => return Err(WorldError::Invariant { id, reason: "occupant grid references stale slot" }),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Species;

    fn setup() -> (SpatialWorld, GameConfig) {
        let config = GameConfig::standard().unwrap();
        let mut world = SpatialWorld::new((20, 15), (6, 6), ["grass", "water", "table"]);
        for pos in (Rect { xmin: 0, xmax: 20, ymin: 0, ymax: 15 }).cells() {
            world.set_material(pos, "grass").unwrap();
        }
        (world, config)
    }

    fn cow(pos: Position, config: &GameConfig) -> Object {
        Object::spawn(Species::Cow, pos, config).unwrap()
    }

    #[test]
    fn test_add_then_get_cell() {
        let (mut world, config) = setup();
        let pos = Position::new(3, 4);
        let id = world.add(cow(pos, &config)).unwrap();
        assert_eq!(world.material_at(pos), Some("grass"));
        assert_eq!(world.occupant_at(pos), Some(id));
        assert!(world.chunk_members(world.chunk_key(pos)).contains(&id));
        world.verify().unwrap();
    }

    #[test]
    fn test_add_onto_occupied_fails() {
        let (mut world, config) = setup();
        let pos = Position::new(1, 1);
        let first = world.add(cow(pos, &config)).unwrap();
        let before = world.clone();
        let err = world.add(cow(pos, &config)).unwrap_err();
        assert_eq!(err, WorldError::Occupied { pos, occupant: first });
        assert_eq!(world, before);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut world, config) = setup();
        let id = world.add(cow(Position::new(2, 2), &config)).unwrap();
        assert!(world.remove(id));
        let once = world.clone();
        assert!(!world.remove(id));
        assert_eq!(world, once);
        assert_eq!(world.occupant_at(Position::new(2, 2)), None);
        assert!(world.object(id).unwrap().removed);
        world.verify().unwrap();
    }

    #[test]
    fn test_slots_never_reused() {
        let (mut world, config) = setup();
        let first = world.add(cow(Position::new(2, 2), &config)).unwrap();
        world.remove(first);
        let second = world.add(cow(Position::new(2, 2), &config)).unwrap();
        assert_ne!(first, second);
        assert_eq!(world.slots(), 2);
    }

    #[test]
    fn test_move_onto_occupied_leaves_state() {
        let (mut world, config) = setup();
        let a = world.add(cow(Position::new(0, 0), &config)).unwrap();
        let b = world.add(cow(Position::new(0, 1), &config)).unwrap();
        let before = world.clone();
        let err = world.move_entity(a, Position::new(0, 1)).unwrap_err();
        assert_eq!(err, WorldError::Occupied { pos: Position::new(0, 1), occupant: b });
        assert_eq!(world, before);
    }

    #[test]
    fn test_move_migrates_chunk() {
        let (mut world, config) = setup();
        let id = world.add(cow(Position::new(5, 5), &config)).unwrap();
        let old_key = world.chunk_key(Position::new(5, 5));
        world.move_entity(id, Position::new(6, 5)).unwrap();
        let new_key = world.chunk_key(Position::new(6, 5));
        assert_ne!(old_key, new_key);
        assert!(!world.chunk_members(old_key).contains(&id));
        assert!(world.chunk_members(new_key).contains(&id));
        world.verify().unwrap();
    }

    #[test]
    fn test_move_removed_is_noop() {
        let (mut world, config) = setup();
        let id = world.add(cow(Position::new(5, 5), &config)).unwrap();
        world.remove(id);
        world.move_entity(id, Position::new(7, 7)).unwrap();
        assert_eq!(world.object(id).unwrap().pos, Position::new(5, 5));
        assert_eq!(world.occupant_at(Position::new(7, 7)), None);
    }

    #[test]
    fn test_out_of_bounds_cell_is_empty() {
        let (world, _) = setup();
        assert_eq!(world.get_cell(Position::new(-1, 3)), Cell::default());
        assert_eq!(world.get_cell(Position::new(20, 0)), Cell::default());
        assert_eq!(world.material_at(Position::new(0, 15)), None);
    }

    #[test]
    fn test_chunk_key_clipped_at_edges() {
        let (world, _) = setup();
        let key = world.chunk_key(Position::new(19, 14));
        assert_eq!(key, Rect { xmin: 18, xmax: 20, ymin: 12, ymax: 15 });
        assert_eq!(world.chunk_keys().len(), 4 * 3);
    }

    #[test]
    fn test_nearby_and_masks() {
        let (mut world, config) = setup();
        world.set_material(Position::new(4, 4), "table").unwrap();
        let id = world.add(cow(Position::new(5, 5), &config)).unwrap();

        let near = world.nearby(Position::new(5, 4), 1);
        assert!(near.materials.contains("table"));
        assert!(near.materials.contains("grass"));
        assert!(near.occupants.contains(&id));

        let far = world.nearby(Position::new(10, 10), 1);
        assert!(!far.materials.contains("table"));

        let key = world.chunk_key(Position::new(4, 4));
        let mask = world.mask_material(key, "grass");
        assert_eq!(mask.count(), 35);
        assert!(!mask.get(Position::new(4, 4)));
        assert_eq!(world.count_material("table"), 1);
        assert_eq!(world.count_material("obsidian"), 0);
    }

    #[test]
    fn test_set_material_registers_names() {
        let (mut world, _) = setup();
        let before = world.palette().len();
        world.set_material(Position::new(0, 0), "obsidian").unwrap();
        assert_eq!(world.palette().len(), before + 1);
        assert_eq!(world.material_at(Position::new(0, 0)), Some("obsidian"));
    }

    #[test]
    fn test_try_move_respects_walkable() {
        let (mut world, config) = setup();
        world.set_material(Position::new(3, 2), "water").unwrap();
        let id = world.add(cow(Position::new(2, 2), &config)).unwrap();
        assert!(!world.try_move(id, Direction::RIGHT, &config));
        assert!(world.try_move(id, Direction::DOWN, &config));
        assert_eq!(world.object(id).unwrap().pos, Position::new(2, 3));
        assert!(!world.try_move(id, Direction::new(-3, 0), &config));
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut world, config) = setup();
        world.add(cow(Position::new(2, 2), &config)).unwrap();
        world.daylight = 0.7;
        world.reset();
        assert_eq!(world.objects().count(), 0);
        assert_eq!(world.material_at(Position::new(2, 2)), None);
        assert_eq!(world.daylight, 0.0);
        assert!(world.chunk_keys().iter().all(|key| world.chunk_members(*key).is_empty()));
    }

    #[test]
    fn test_palette_full_rejects_new_names() {
        let mut palette = Palette::new([] as [&str; 0]);
        for i in 0..u16::MAX {
            palette.register(&format!("m{i}")).unwrap();
        }
        assert_eq!(palette.len(), u16::MAX as usize);
        assert!(matches!(palette.register("one_more"), Err(WorldError::PaletteFull { .. })));
        assert_eq!(palette.register("m7").unwrap(), MaterialId(8));
        assert_eq!(palette.len(), u16::MAX as usize);
    }
}
