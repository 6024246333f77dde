//! Client-side descriptions of the procedures mounted by [`crate::router::mount`].

use effect_rpc_client::{Procedure, ProcedureKind};

pub struct Procedures;

pub struct Ping;

impl Procedure for Ping {
    type Input = ();
    type Output = String;
    type Procedures = Procedures;

    const KEY: &'static str = "ping";
    const KIND: ProcedureKind = ProcedureKind::Query;
}

pub struct Mutate;

impl Procedure for Mutate {
    type Input = ();
    type Output = ();
    type Procedures = Procedures;

    const KEY: &'static str = "mutate";
    const KIND: ProcedureKind = ProcedureKind::Mutation;
}
