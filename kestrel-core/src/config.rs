//! Tracker configuration tree.
//!
//! The configuration is a single JSON document with camelCase keys. Every
//! section and field carries a default, so a partial document — or an empty
//! `{}` — is valid and yields a usable tracker.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::prediction::IMM_NUM_MODELS;

/// Which clustering algorithm groups detections into measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMethod {
    Dbscan,
    RangeBased,
    RangeStrength,
}

/// Which strategy pairs clusters with tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationMethod {
    Mahalanobis,
    Gnn,
    Jpda,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemConfig {
    pub cycle_period_ms: u32,
    pub max_detections_per_dwell: u32,
    pub max_tracks: u32,
    pub log_directory: String,
    pub log_enabled: bool,
    /// 0 = error .. 4 = trace
    pub log_level: u8,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            cycle_period_ms: 100,
            max_detections_per_dwell: 256,
            max_tracks: 200,
            log_directory: "./logs".to_string(),
            log_enabled: true,
            log_level: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    pub receiver_ip: String,
    pub receiver_port: u16,
    pub sender_ip: String,
    pub sender_port: u16,
    pub receive_buffer_size: usize,
    pub send_buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            receiver_ip: "0.0.0.0".to_string(),
            receiver_port: 50000,
            sender_ip: "127.0.0.1".to_string(),
            sender_port: 50001,
            receive_buffer_size: 65536,
            send_buffer_size: 65536,
        }
    }
}

/// Physical-envelope gates applied to every raw detection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreprocessConfig {
    pub min_range: f64,
    pub max_range: f64,
    pub min_azimuth: f64,
    pub max_azimuth: f64,
    pub min_elevation: f64,
    pub max_elevation: f64,
    #[serde(rename = "minSNR")]
    pub min_snr: f64,
    #[serde(rename = "maxSNR")]
    pub max_snr: f64,
    #[serde(rename = "minRCS")]
    pub min_rcs: f64,
    #[serde(rename = "maxRCS")]
    pub max_rcs: f64,
    pub min_strength: f64,
    pub max_strength: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            min_range: 50.0,
            max_range: 20_000.0,
            min_azimuth: -std::f64::consts::PI,
            max_azimuth: std::f64::consts::PI,
            min_elevation: -0.1745,
            max_elevation: 1.5708,
            min_snr: 8.0,
            max_snr: 60.0,
            min_rcs: -30.0,
            max_rcs: 20.0,
            min_strength: -100.0,
            max_strength: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DbscanConfig {
    /// Range scale of the normalized neighbourhood distance, meters
    pub epsilon_range: f64,
    /// Azimuth scale, radians
    pub epsilon_azimuth: f64,
    /// Elevation scale, radians
    pub epsilon_elevation: f64,
    pub min_points: usize,
}

impl Default for DbscanConfig {
    fn default() -> Self {
        DbscanConfig {
            epsilon_range: 50.0,
            epsilon_azimuth: 0.02,
            epsilon_elevation: 0.02,
            min_points: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeBasedConfig {
    pub range_gate_size: f64,
    pub azimuth_gate_size: f64,
    pub elevation_gate_size: f64,
}

impl Default for RangeBasedConfig {
    fn default() -> Self {
        RangeBasedConfig {
            range_gate_size: 75.0,
            azimuth_gate_size: 0.03,
            elevation_gate_size: 0.03,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeStrengthConfig {
    pub range_gate_size: f64,
    pub azimuth_gate_size: f64,
    pub elevation_gate_size: f64,
    /// Additional gate on |Δstrength| in dB
    pub strength_gate_size: f64,
}

impl Default for RangeStrengthConfig {
    fn default() -> Self {
        RangeStrengthConfig {
            range_gate_size: 75.0,
            azimuth_gate_size: 0.03,
            elevation_gate_size: 0.03,
            strength_gate_size: 6.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    pub method: ClusterMethod,
    pub dbscan: DbscanConfig,
    pub range_based: RangeBasedConfig,
    pub range_strength: RangeStrengthConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            method: ClusterMethod::Dbscan,
            dbscan: DbscanConfig::default(),
            range_based: RangeBasedConfig::default(),
            range_strength: RangeStrengthConfig::default(),
        }
    }
}

/// IMM bank parameters. The bank size is fixed at compile time; the
/// `numModels` field is accepted on input but not consulted at runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImmConfig {
    pub num_models: usize,
    pub initial_mode_probabilities: [f64; IMM_NUM_MODELS],
    /// Row-stochastic Markov transition matrix π, π[i][j] = P(i → j)
    pub transition_matrix: [[f64; IMM_NUM_MODELS]; IMM_NUM_MODELS],
}

impl Default for ImmConfig {
    fn default() -> Self {
        let mut transition = [[0.05; IMM_NUM_MODELS]; IMM_NUM_MODELS];
        for (i, row) in transition.iter_mut().enumerate() {
            row[i] = 0.8;
        }
        ImmConfig {
            num_models: IMM_NUM_MODELS,
            initial_mode_probabilities: [0.4, 0.15, 0.15, 0.15, 0.15],
            transition_matrix: transition,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CvConfig {
    pub process_noise_std: f64,
}

impl Default for CvConfig {
    fn default() -> Self {
        CvConfig {
            process_noise_std: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaConfig {
    pub process_noise_std: f64,
    /// Per-step multiplier applied to the acceleration states
    pub accel_decay_rate: f64,
}

impl Default for CaConfig {
    fn default() -> Self {
        CaConfig {
            process_noise_std: 2.0,
            accel_decay_rate: 0.95,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CtrConfig {
    pub process_noise_std: f64,
    pub turn_rate_noise_std: f64,
}

impl Default for CtrConfig {
    fn default() -> Self {
        CtrConfig {
            process_noise_std: 1.5,
            turn_rate_noise_std: 0.05,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PredictionConfig {
    pub imm: ImmConfig,
    pub cv: CvConfig,
    pub ca1: CaConfig,
    pub ca2: CaConfig,
    pub ctr1: CtrConfig,
    pub ctr2: CtrConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MahalanobisConfig {
    /// Accept pairs with squared distance at or below this
    pub distance_threshold: f64,
}

impl Default for MahalanobisConfig {
    fn default() -> Self {
        MahalanobisConfig {
            distance_threshold: 9.21,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GnnConfig {
    pub cost_threshold: f64,
}

impl Default for GnnConfig {
    fn default() -> Self {
        GnnConfig {
            cost_threshold: 16.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JpdaConfig {
    pub gate_size: f64,
    pub clutter_density: f64,
    pub detection_probability: f64,
}

impl Default for JpdaConfig {
    fn default() -> Self {
        JpdaConfig {
            gate_size: 16.0,
            clutter_density: 1e-6,
            detection_probability: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssociationConfig {
    pub method: AssociationMethod,
    /// Squared-Mahalanobis gate shared by all associators
    pub gating_threshold: f64,
    pub mahalanobis: MahalanobisConfig,
    pub gnn: GnnConfig,
    pub jpda: JpdaConfig,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        AssociationConfig {
            method: AssociationMethod::Gnn,
            gating_threshold: 16.0,
            mahalanobis: MahalanobisConfig::default(),
            gnn: GnnConfig::default(),
            jpda: JpdaConfig::default(),
        }
    }
}

/// M-of-N initiation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitiationConfig {
    pub m: u32,
    pub n: u32,
    pub max_initiation_range: f64,
    /// Maximum plausible closing speed for candidate continuity, m/s
    pub velocity_gate: f64,
}

impl Default for InitiationConfig {
    fn default() -> Self {
        InitiationConfig {
            m: 3,
            n: 5,
            max_initiation_range: 15_000.0,
            velocity_gate: 100.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaintenanceConfig {
    pub confirm_hits: u32,
    pub quality_decay_rate: f64,
    pub quality_boost: f64,
    pub min_quality_threshold: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        MaintenanceConfig {
            confirm_hits: 5,
            quality_decay_rate: 0.95,
            quality_boost: 0.1,
            min_quality_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeletionConfig {
    pub max_coasting_dwells: u32,
    pub min_quality: f64,
    pub max_range: f64,
}

impl Default for DeletionConfig {
    fn default() -> Self {
        DeletionConfig {
            max_coasting_dwells: 15,
            min_quality: 0.05,
            max_range: 25_000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitialCovarianceConfig {
    pub position_std: f64,
    pub velocity_std: f64,
    pub acceleration_std: f64,
}

impl Default for InitialCovarianceConfig {
    fn default() -> Self {
        InitialCovarianceConfig {
            position_std: 50.0,
            velocity_std: 20.0,
            acceleration_std: 5.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackManagementConfig {
    pub initiation: InitiationConfig,
    pub maintenance: MaintenanceConfig,
    pub deletion: DeletionConfig,
    pub initial_covariance: InitialCovarianceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayConfig {
    pub send_deleted_tracks: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            send_deleted_tracks: true,
        }
    }
}

/// The full tracker configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    pub system: SystemConfig,
    pub network: NetworkConfig,
    pub preprocessing: PreprocessConfig,
    pub clustering: ClusterConfig,
    pub prediction: PredictionConfig,
    pub association: AssociationConfig,
    pub track_management: TrackManagementConfig,
    pub display: DisplayConfig,
}

impl TrackerConfig {
    /// Parses a configuration document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let cfg: TrackerConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let init = &self.track_management.initiation;
        if init.m == 0 || init.n < init.m {
            return Err(ConfigError::Invalid(format!(
                "initiation requires 0 < m <= n, got m={} n={}",
                init.m, init.n
            )));
        }
        let probs = &self.prediction.imm.initial_mode_probabilities;
        let sum: f64 = probs.iter().sum();
        if probs.iter().any(|p| *p < 0.0) || (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid(format!(
                "initialModeProbabilities must be a simplex, sum={sum}"
            )));
        }
        Ok(())
    }
}
