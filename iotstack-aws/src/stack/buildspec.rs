//! Frontend build specification
//!
//! Rendered as JSON, which is also a valid YAML document and is accepted
//! wherever the hosting service expects a YAML build spec.

use serde::Serialize;

pub const BUILD_SPEC_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSpec {
    pub version: u32,
    pub frontend: FrontendBuild,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrontendBuild {
    pub phases: Phases,
    pub artifacts: Artifacts,
    pub cache: Cache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phases {
    pub pre_build: Phase,
    pub build: Phase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    pub base_directory: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cache {
    pub paths: Vec<String>,
}

impl BuildSpec {
    /// Install dependencies, build, publish `dist`
    pub fn node_frontend() -> Self {
        Self {
            version: BUILD_SPEC_VERSION,
            frontend: FrontendBuild {
                phases: Phases {
                    pre_build: Phase {
                        commands: vec!["npm ci".to_string()],
                    },
                    build: Phase {
                        commands: vec!["npm run build".to_string()],
                    },
                },
                artifacts: Artifacts {
                    base_directory: "dist".to_string(),
                    files: vec!["**/*".to_string()],
                },
                cache: Cache {
                    paths: vec!["node_modules/**/*".to_string()],
                },
            },
        }
    }

    /// Render the document as text
    pub fn render(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
