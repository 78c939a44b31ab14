//! Bagged classification-tree ensemble
//!
//! Trees are grown with weighted Gini impurity on bootstrap resamples of
//! standardized rows. Inference is a majority vote: `predict_proba`
//! reports the fraction of trees voting for each class and `predict`
//! picks the larger one, with Real winning a tie.
//!
//! # Model Format
//!
//! Models are serialized as canonical JSON (sorted keys):
//!
//! ```json
//! {
//!   "class_weights": [0.75, 1.5],
//!   "config": {"class_weight":"balanced","max_depth":15,"max_features":null,
//!              "min_samples_split":2,"seed":42,"tree_count":300},
//!   "n_features": 9,
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"feature_idx":3,"id":0,"leaf":null,"left":1,"right":2,"threshold":-0.41},
//!         {"feature_idx":-1,"id":1,"leaf":"real","left":-1,"right":-1,"threshold":0.0},
//!         {"feature_idx":-1,"id":2,"leaf":"fake","left":-1,"right":-1,"threshold":0.0}
//!       ]
//!     }
//!   ],
//!   "version": 1
//! }
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use profileguard_ai_core::forest::{EnsembleClassifier, ForestConfig};
//! use profileguard_ai_core::Label;
//!
//! let features = vec![vec![-1.0], vec![-0.9], vec![1.0], vec![1.1]];
//! let labels = vec![Label::Real, Label::Real, Label::Fake, Label::Fake];
//!
//! let model = EnsembleClassifier::fit(&features, &labels, ForestConfig::default()).unwrap();
//! let (label, confidence) = model.predict_with_confidence(&[0.95]).unwrap();
//! let hash = model.hash_hex().unwrap();
//! ```

pub mod builder;
pub mod model;
pub mod tree;

pub use builder::TreeConfig;
pub use model::{class_weights, ClassWeight, EnsembleClassifier, ForestConfig, FORMAT_VERSION};
pub use tree::{Node, Tree};
