//! Live views of the drivers in the current race.
//!
//! A [`Driver`] holds no values, only the way to find them: every accessor
//! re-resolves the driver's pointer chain, so a read always reflects the
//! game's memory at that moment.

use serde::Serialize;

use crate::error::Result;
use crate::layout::{DriverFields, DriverLayout, OPPONENT_COUNT};
use crate::memory::{AddressSpace, PointerChain};
use crate::process::RemoteProcess;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

pub struct Driver<P: RemoteProcess> {
    space: AddressSpace<P>,
    base: u32,
    chain: PointerChain,
    fields: DriverFields,
}

impl<P: RemoteProcess> Driver<P> {
    pub fn new(space: AddressSpace<P>, base: u32, chain: PointerChain, fields: DriverFields) -> Self {
        Self {
            space,
            base,
            chain,
            fields,
        }
    }

    /// Current address of the driver structure.
    pub fn address(&self) -> Result<u32> {
        self.space.calculate_pointer(self.base, &self.chain)
    }

    fn field(&self, offset: i32) -> Result<u32> {
        Ok(self.address()?.wrapping_add_signed(offset))
    }

    fn read_vec3(&self, offsets: [i32; 3]) -> Result<Vec3> {
        let address = self.address()?;
        let at = |o: i32| self.space.read_f32(address.wrapping_add_signed(o));
        Ok(Vec3 {
            x: at(offsets[0])?,
            y: at(offsets[1])?,
            z: at(offsets[2])?,
        })
    }

    pub fn x(&self) -> Result<f32> {
        self.space.read_f32(self.field(self.fields.position[0])?)
    }

    pub fn position(&self) -> Result<Vec3> {
        self.read_vec3(self.fields.position)
    }

    pub fn velocity(&self) -> Result<Vec3> {
        self.read_vec3(self.fields.velocity)
    }

    pub fn vector1(&self) -> Result<Vec3> {
        self.read_vec3(self.fields.vector1)
    }

    pub fn vector2(&self) -> Result<Vec3> {
        self.read_vec3(self.fields.vector2)
    }

    /// Code of the power-up brick being carried.
    pub fn power_up(&self) -> Result<i32> {
        self.space.read_i32(self.field(self.fields.power_up)?)
    }

    pub fn white_bricks(&self) -> Result<i32> {
        self.space.read_i32(self.field(self.fields.white_bricks)?)
    }

    /// The structure is populated once its X coordinate leaves zero.
    pub fn is_valid(&self) -> bool {
        matches!(self.x(), Ok(x) if x != 0.0)
    }
}

/// The local player and the fixed opponent slots of one race.
///
/// Opponent slots exist even when fewer AI drivers take part.
pub struct RaceDrivers<P: RemoteProcess> {
    pub player: Driver<P>,
    pub opponents: [Driver<P>; OPPONENT_COUNT],
}

impl<P: RemoteProcess> RaceDrivers<P> {
    pub fn player(space: &AddressSpace<P>, layout: &DriverLayout) -> Driver<P> {
        Driver::new(space.clone(), layout.base, layout.player.clone(), layout.fields)
    }

    pub fn new(player: Driver<P>, space: &AddressSpace<P>, layout: &DriverLayout) -> Self {
        let opponents = std::array::from_fn(|i| {
            Driver::new(
                space.clone(),
                layout.base,
                layout.opponents[i].clone(),
                layout.fields,
            )
        });
        Self { player, opponents }
    }
}
