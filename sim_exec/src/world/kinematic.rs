//! # Kinematic world
//!
//! A world without dynamics: bodies are points which stay where they are put.
//! The only motion it produces itself is the shaker table, which moves the
//! table and every gate along +Y as simulated time advances.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use log::{debug, info};
use nalgebra::Vector3;

use super::{
    gate_body_name, Params, ShakerTableParams, World, WorldError, POINTER_GROUP, STICK_BODY,
    TABLE_BODY, TOOLTIP_BODY,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct KinematicWorld {
    bodies: HashMap<String, Vector3<f64>>,
    groups: HashMap<String, Vec<String>>,

    /// Resting positions of bodies moved by the shaker table
    table_mounted: Vec<(String, Vector3<f64>)>,
    shaker_table: ShakerTableParams,

    dt_s: f64,
    time_s: f64,
    num_steps: u64,
    step_limit: Option<u64>,
    alive: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KinematicWorld {
    /// Build the world with all bodies at rest.
    pub fn new(params: &Params) -> Self {
        let mut bodies = HashMap::new();
        let mut table_mounted = Vec::new();

        for (g, pos) in params.gate_positions_m.iter().enumerate() {
            let pos = Vector3::from(*pos);
            bodies.insert(gate_body_name(g), pos);
            table_mounted.push((gate_body_name(g), pos));
        }

        let table = Vector3::from(params.table_pos_m);
        bodies.insert(String::from(TABLE_BODY), table);
        table_mounted.push((String::from(TABLE_BODY), table));

        let tooltip = Vector3::from(params.tooltip_rest_m);
        bodies.insert(String::from(TOOLTIP_BODY), tooltip);
        bodies.insert(String::from(STICK_BODY), tooltip);

        let mut groups = HashMap::new();
        groups.insert(
            String::from(POINTER_GROUP),
            vec![String::from(TOOLTIP_BODY), String::from(STICK_BODY)],
        );

        info!(
            "KinematicWorld created with {} gates, shaker table {}",
            params.gate_positions_m.len(),
            if params.shaker_table.oscillating { "oscillating" } else { "at rest" }
        );

        Self {
            bodies,
            groups,
            table_mounted,
            shaker_table: params.shaker_table,
            dt_s: 0.0,
            time_s: 0.0,
            num_steps: 0,
            step_limit: params.step_limit,
            alive: true,
        }
    }

    /// Simulated time, advanced only by unpaused steps.
    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    /// Number of steps taken, paused or not.
    pub fn num_steps(&self) -> u64 {
        self.num_steps
    }

    /// Duration of the next step as last set by `set_dt`.
    pub fn dt_s(&self) -> f64 {
        self.dt_s
    }

    /// Close the world, as if the viewer had been shut.
    pub fn close(&mut self) {
        self.alive = false;
    }

    fn apply_shaker_table(&mut self) {
        if !self.shaker_table.oscillating {
            return;
        }

        let dy = Vector3::new(0.0, self.shaker_table.displacement_m(self.time_s), 0.0);

        for (name, rest) in self.table_mounted.iter() {
            self.bodies.insert(name.clone(), rest + dy);
        }
    }
}

impl World for KinematicWorld {
    fn body_position(&self, name: &str) -> Result<Vector3<f64>, WorldError> {
        self.bodies
            .get(name)
            .copied()
            .ok_or_else(|| WorldError::UnknownBody(String::from(name)))
    }

    fn set_body_position(&mut self, name: &str, position_m: Vector3<f64>) -> Result<(), WorldError> {
        match self.bodies.get_mut(name) {
            Some(p) => {
                *p = position_m;
                Ok(())
            }
            None => Err(WorldError::UnknownBody(String::from(name))),
        }
    }

    fn set_group_position(&mut self, group: &str, position_m: Vector3<f64>) -> Result<(), WorldError> {
        let members = self
            .groups
            .get(group)
            .ok_or_else(|| WorldError::UnknownGroup(String::from(group)))?;

        for name in members.iter() {
            match self.bodies.get_mut(name) {
                Some(p) => *p = position_m,
                None => return Err(WorldError::UnknownBody(name.clone())),
            }
        }

        Ok(())
    }

    fn set_dt(&mut self, dt_s: f64) {
        self.dt_s = dt_s;
    }

    fn step(&mut self, paused: bool) -> Result<(), WorldError> {
        if !self.alive {
            return Err(WorldError::Disconnected);
        }

        if !paused && self.dt_s.is_finite() && self.dt_s > 0.0 {
            self.time_s += self.dt_s;
            self.apply_shaker_table();
        }

        self.num_steps += 1;

        if let Some(limit) = self.step_limit {
            if self.num_steps >= limit {
                debug!("KinematicWorld step limit ({}) reached, closing", limit);
                self.alive = false;
            }
        }

        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::world::gate_positions;

    fn params() -> Params {
        Params {
            gate_positions_m: vec![[0.1, 0.0, 0.0], [0.2, 0.0, 0.05]],
            tooltip_rest_m: [0.0, 0.3, 0.0],
            table_pos_m: [0.0, -0.1, 0.0],
            shaker_table: ShakerTableParams::default(),
            step_limit: None,
        }
    }

    #[test]
    fn test_bodies_and_groups() {
        let mut world = KinematicWorld::new(&params());

        assert_eq!(world.body_position("gate1").unwrap(), Vector3::new(0.2, 0.0, 0.05));
        assert_eq!(world.body_position(TOOLTIP_BODY).unwrap(), Vector3::new(0.0, 0.3, 0.0));
        assert!(matches!(world.body_position("gate2"), Err(WorldError::UnknownBody(_))));

        let target = Vector3::new(0.01, 0.02, 0.03);
        world.set_group_position(POINTER_GROUP, target).unwrap();
        assert_eq!(world.body_position(TOOLTIP_BODY).unwrap(), target);
        assert_eq!(world.body_position(STICK_BODY).unwrap(), target);
        assert!(matches!(
            world.set_group_position("arm", target),
            Err(WorldError::UnknownGroup(_))
        ));

        world.set_body_position("gate0", Vector3::new(0.1, 0.01, 0.0)).unwrap();
        assert_eq!(world.body_position("gate0").unwrap(), Vector3::new(0.1, 0.01, 0.0));
        assert!(world.set_body_position("gate9", target).is_err());

        assert_eq!(gate_positions(&world, 2).unwrap().len(), 2);
        assert!(gate_positions(&world, 3).is_err());
    }

    #[test]
    fn test_paused_step_keeps_time() {
        let mut world = KinematicWorld::new(&params());
        world.set_dt(0.1);

        world.step(true).unwrap();
        assert_eq!(world.time_s(), 0.0);

        world.step(false).unwrap();
        assert!((world.time_s() - 0.1).abs() < 1e-12);
        assert_eq!(world.num_steps(), 2);
    }

    #[test]
    fn test_shaker_table_moves_gates() {
        let mut p = params();
        p.shaker_table = ShakerTableParams {
            oscillating: true,
            amp_m: 0.02,
            freq_hz: 1.0,
        };
        let mut world = KinematicWorld::new(&p);

        // A quarter period puts the table at full amplitude
        world.set_dt(0.25);
        world.step(false).unwrap();

        let gate0 = world.body_position("gate0").unwrap();
        assert!((gate0 - Vector3::new(0.1, 0.02, 0.0)).norm() < 1e-12);
        let table = world.body_position(TABLE_BODY).unwrap();
        assert!((table - Vector3::new(0.0, -0.08, 0.0)).norm() < 1e-12);

        // Paused steps leave it where it is
        world.step(true).unwrap();
        assert!((world.body_position("gate0").unwrap() - gate0).norm() < 1e-12);
    }

    #[test]
    fn test_step_limit_closes_world() {
        let mut p = params();
        p.step_limit = Some(2);
        let mut world = KinematicWorld::new(&p);

        world.step(true).unwrap();
        assert!(world.is_alive());
        world.step(true).unwrap();
        assert!(!world.is_alive());
        assert!(matches!(world.step(true), Err(WorldError::Disconnected)));
    }
}
