pub mod cache_schema;
pub mod committee;
pub mod config;
pub mod request;
pub mod response;
pub mod signals;

pub use cache_schema::{CacheCategory, CacheRow};
pub use committee::{
    ConfidenceLevel, CritiqueAssessment, Direction, ExecutorDecision, RiskLevel, SkepticCritique,
    StageRole, StrategistProposal,
};
pub use config::{
    CacheConfig, CommitteeConfig, EngineConfig, NotificationConfig, ScheduleConfig, SignalsConfig,
    StoreConfig, SuperbotConfig,
};
pub use request::AnalysisRequest;
pub use response::{AnalysisResponse, ErrorKind, FinalDecision, RunError};
pub use signals::{
    CrossoverStatus, FearGreedReading, Momentum, NewsAnalysis, NewsSentiment, SignalKind,
    SupportResistanceLevels, TechnicalAnalysis,
};
