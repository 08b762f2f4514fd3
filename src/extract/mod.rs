//! Parse-result extraction: turning a finished (or in-progress) Sigma-set
//! run into something a caller actually wants: a single concrete tree,
//! or a full ambiguity-preserving forest, built either after the fact or
//! online as the input is consumed.

pub mod single_tree;
pub mod sppf_bottom_up;
pub mod sppf_top_down;
