use serde::{Deserialize, Serialize};

/// The squashing function applied to the
/// input sum of every non-sensor node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationType {
    /// The standard logistic function.
    Sigmoid,
    /// The logistic function steepened by a factor
    /// of 4.9, close to linear in [-0.5, 0.5].
    SteepenedSigmoid,
    Identity,
    ReLU,
    Tanh,
    Gaussian,
    Sinusoidal,
}

impl ActivationType {
    /// Applies the function to `input_sum`.
    ///
    /// # Examples
    /// ```
    /// use evoneat_nn::networks::ActivationType;
    ///
    /// assert_eq!(ActivationType::Sigmoid.apply(0.0), 0.5);
    /// assert_eq!(ActivationType::ReLU.apply(-3.0), 0.0);
    /// assert_eq!(ActivationType::Identity.apply(-3.0), -3.0);
    /// ```
    pub fn apply(self, input_sum: f32) -> f32 {
        match self {
            ActivationType::Sigmoid => 1.0 / (1.0 + (-input_sum).exp()),
            ActivationType::SteepenedSigmoid => 1.0 / (1.0 + (-4.9 * input_sum).exp()),
            ActivationType::Identity => input_sum,
            ActivationType::ReLU => input_sum.max(0.0),
            ActivationType::Tanh => input_sum.tanh(),
            ActivationType::Gaussian => (-input_sum.powf(2.0)).exp(),
            ActivationType::Sinusoidal => (input_sum * std::f32::consts::PI).sin(),
        }
    }
}
