use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Citizen,      // 市民
    Police,       // 警察（夜に調査できる）
    PlagueDoctor, // 医者（夜に一人を治療できる）
    Zombie,       // ゾンビ（夜に感染対象を指定できる）
    Mutant,       // ミュータント（第三陣営、投票不可）
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Citizen,
    Zombie,
    Mutant,
}

impl Role {
    pub fn faction(&self) -> Faction {
        match self {
            Role::Zombie => Faction::Zombie,
            Role::Mutant => Faction::Mutant,
            _ => Faction::Citizen,
        }
    }

    pub fn can_vote(&self) -> bool {
        !matches!(self, Role::Mutant)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Citizen => write!(f, "市民"),
            Role::Police => write!(f, "警察"),
            Role::PlagueDoctor => write!(f, "医者"),
            Role::Zombie => write!(f, "ゾンビ"),
            Role::Mutant => write!(f, "ミュータント"),
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Faction::Citizen => write!(f, "市民"),
            Faction::Zombie => write!(f, "ゾンビ"),
            Faction::Mutant => write!(f, "ミュータント"),
        }
    }
}
