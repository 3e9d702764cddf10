//! This module contains the definitions of polynomial types used by the pipeline.
pub mod eq;
pub mod multilinear;
pub mod univariate;
