//! # Resource Kinds
//!
//! Kind inference from file extensions. Matching is case-insensitive and
//! anything not in the table is [`ResourceKind::RawData`].

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Category of a resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Not specified; inferred from the extension on load.
    #[default]
    Unknown,
    /// Images.
    Texture,
    /// Geometry.
    Mesh,
    /// Shader source or bytecode.
    Shader,
    /// Material definitions.
    Material,
    /// Sound.
    Audio,
    /// Scripts.
    Script,
    /// Fonts.
    Font,
    /// Animation clips.
    Animation,
    /// Configuration documents.
    Config,
    /// Scenes.
    Scene,
    /// Prefabs.
    Prefab,
    /// Anything else.
    RawData,
}

const EXTENSIONS: &[(ResourceKind, &[&str])] = &[
    (ResourceKind::Texture, &["png", "jpg", "jpeg", "bmp", "tga", "dds", "hdr", "ktx"]),
    (ResourceKind::Mesh, &["obj", "fbx", "gltf", "glb", "dae", "3ds"]),
    (ResourceKind::Shader, &["hlsl", "glsl", "vert", "frag", "comp", "cso", "spv"]),
    (ResourceKind::Material, &["mat", "material"]),
    (ResourceKind::Audio, &["wav", "mp3", "ogg", "flac", "aiff"]),
    (ResourceKind::Script, &["lua", "js", "py"]),
    (ResourceKind::Font, &["ttf", "otf", "fnt"]),
    (ResourceKind::Animation, &["anim", "animation"]),
    (ResourceKind::Config, &["json", "xml", "yaml", "ini", "cfg", "toml"]),
    (ResourceKind::Scene, &["scene"]),
    (ResourceKind::Prefab, &["prefab"]),
];

impl ResourceKind {
    /// Infers the kind from an extension (without the dot).
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        EXTENSIONS
            .iter()
            .find(|(_, extensions)| {
                extensions
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(extension))
            })
            .map_or(Self::RawData, |(kind, _)| *kind)
    }

    /// Infers the kind from a path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|extension| extension.to_str())
            .map_or(Self::RawData, Self::from_extension)
    }

    /// `self`, or the kind inferred from `path` if `self` is `Unknown`.
    #[must_use]
    pub fn resolve(self, path: &Path) -> Self {
        if self == Self::Unknown {
            Self::from_path(path)
        } else {
            self
        }
    }

    /// Extensions that infer to this kind.
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match EXTENSIONS.iter().find(|(kind, _)| *kind == self) {
            Some((_, extensions)) => *extensions,
            None => &[],
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Texture => "texture",
            Self::Mesh => "mesh",
            Self::Shader => "shader",
            Self::Material => "material",
            Self::Audio => "audio",
            Self::Script => "script",
            Self::Font => "font",
            Self::Animation => "animation",
            Self::Config => "config",
            Self::Scene => "scene",
            Self::Prefab => "prefab",
            Self::RawData => "raw",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_is_case_insensitive() {
        assert_eq!(ResourceKind::from_extension("PNG"), ResourceKind::Texture);
        assert_eq!(ResourceKind::from_path(Path::new("/a/b.GlB")), ResourceKind::Mesh);
        assert_eq!(ResourceKind::from_path(Path::new("shader.spv")), ResourceKind::Shader);
    }

    #[test]
    fn test_unknown_extensions_are_raw() {
        assert_eq!(ResourceKind::from_extension("bin"), ResourceKind::RawData);
        assert_eq!(ResourceKind::from_path(Path::new("README")), ResourceKind::RawData);
    }

    #[test]
    fn test_resolve_keeps_explicit_kind() {
        let path = Path::new("level.json");
        assert_eq!(ResourceKind::Unknown.resolve(path), ResourceKind::Config);
        assert_eq!(ResourceKind::Scene.resolve(path), ResourceKind::Scene);
    }

    #[test]
    fn test_every_kind_round_trips_its_extensions() {
        for (kind, extensions) in EXTENSIONS {
            assert_eq!(kind.extensions(), *extensions);
            for extension in *extensions {
                assert_eq!(ResourceKind::from_extension(extension), *kind);
            }
        }
        assert!(ResourceKind::RawData.extensions().is_empty());
    }
}
