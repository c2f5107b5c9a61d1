// src/lib.rs
// Point d'entrée de la bibliothèque du cœur de sécurité
#![cfg_attr(not(test), no_std)] // Pas de bibliothèque standard hors tests

// Import de alloc pour les allocations dynamiques
extern crate alloc;

// Modules du cœur
pub mod security;

// Réexportations principales
pub use security::{init, ContextManager, SecurityConfig, SecurityError, SecurityResult};
