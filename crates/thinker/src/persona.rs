use uuid::Uuid;

use conclave_memory::Memory;
use conclave_prompt::Identity;
use conclave_traits::TraitVector;

/// A parameterized agent: identity, an immutable trait vector, and
/// exclusively-owned memory. No two personas share a `Memory` instance.
pub struct Persona {
    pub id: Uuid,
    pub identity: Identity,
    pub traits: TraitVector,
    pub memory: Memory,
}

impl Persona {
    pub fn new(identity: Identity, traits: TraitVector, memory: Memory) -> Self {
        Self { id: Uuid::new_v4(), identity, traits, memory }
    }
}
