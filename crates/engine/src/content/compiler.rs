use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use roxmltree::{Document, Node};
use tracing::debug;

use crate::AppPaths;

use super::database::{
    InteractableActionDef, InteractableDef, PortalDef, PortalTransit, SegmentDef, VehicleDef,
    WorldDefDatabase,
};
use super::discovery::{discover_mod_sources, ModSource};
use super::types::{
    ContentErrorCode, ContentLoadError, ContentRequest, DiscoveryError, SourceLocation,
    WorldSegment,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DefKind {
    Segment,
    Portal,
    Interactable,
    Vehicle,
}

impl DefKind {
    fn tag(self) -> &'static str {
        match self {
            DefKind::Segment => "SegmentDef",
            DefKind::Portal => "PortalDef",
            DefKind::Interactable => "InteractableDef",
            DefKind::Vehicle => "VehicleDef",
        }
    }
}

#[derive(Debug, Clone)]
enum ParsedDef {
    Segment(SegmentDef),
    Portal(PortalDef),
    Interactable(InteractableDef),
    Vehicle(VehicleDef),
}

impl ParsedDef {
    fn kind(&self) -> DefKind {
        match self {
            ParsedDef::Segment(_) => DefKind::Segment,
            ParsedDef::Portal(_) => DefKind::Portal,
            ParsedDef::Interactable(_) => DefKind::Interactable,
            ParsedDef::Vehicle(_) => DefKind::Vehicle,
        }
    }

    fn def_name(&self) -> &str {
        match self {
            ParsedDef::Segment(def) => &def.def_name,
            ParsedDef::Portal(def) => &def.def_name,
            ParsedDef::Interactable(def) => &def.def_name,
            ParsedDef::Vehicle(def) => &def.def_name,
        }
    }
}

#[derive(Debug, Clone)]
struct Origin {
    mod_id: String,
    file_path: PathBuf,
    location: Option<SourceLocation>,
}

impl Origin {
    fn error(&self, code: ContentErrorCode, message: String) -> ContentLoadError {
        ContentLoadError {
            code,
            message,
            mod_id: self.mod_id.clone(),
            file_path: self.file_path.clone(),
            location: self.location,
        }
    }
}

/// Defs of one kind, keyed by name. A later mod replaces an entry where it
/// was first declared.
struct DefTable<T> {
    entries: Vec<(T, Origin)>,
    index: HashMap<String, usize>,
}

impl<T> Default for DefTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> DefTable<T> {
    fn upsert(&mut self, def_name: &str, def: T, origin: Origin) {
        match self.index.get(def_name) {
            Some(&slot) => self.entries[slot] = (def, origin),
            None => {
                self.index.insert(def_name.to_string(), self.entries.len());
                self.entries.push((def, origin));
            }
        }
    }
}

#[derive(Default)]
struct MergedDefs {
    segments: DefTable<SegmentDef>,
    portals: DefTable<PortalDef>,
    interactables: DefTable<InteractableDef>,
    vehicles: DefTable<VehicleDef>,
}

impl MergedDefs {
    fn insert(&mut self, def: ParsedDef, origin: Origin) {
        match def {
            ParsedDef::Segment(def) => self.segments.upsert(&def.def_name.clone(), def, origin),
            ParsedDef::Portal(def) => self.portals.upsert(&def.def_name.clone(), def, origin),
            ParsedDef::Interactable(def) => {
                self.interactables.upsert(&def.def_name.clone(), def, origin)
            }
            ParsedDef::Vehicle(def) => self.vehicles.upsert(&def.def_name.clone(), def, origin),
        }
    }
}

pub(crate) struct CompiledWorld {
    pub database: WorldDefDatabase,
    pub xml_files_by_mod: Vec<(String, usize)>,
}

pub(crate) fn compile_world_defs(
    app_paths: &AppPaths,
    request: &ContentRequest,
) -> Result<CompiledWorld, ContentLoadError> {
    let sources = discover_mod_sources(app_paths, request)
        .map_err(|error| map_discovery_error(error, &app_paths.root))?;

    let mut merged = MergedDefs::default();
    let mut xml_files_by_mod = Vec::with_capacity(sources.len());

    for source in &sources {
        let file_count = merge_mod(source, &mut merged)?;
        xml_files_by_mod.push((source.mod_id.clone(), file_count));
    }

    let database = validate_references(merged, &app_paths.base_content_dir)?;
    Ok(CompiledWorld {
        database,
        xml_files_by_mod,
    })
}

fn merge_mod(source: &ModSource, merged: &mut MergedDefs) -> Result<usize, ContentLoadError> {
    let xml_files = collect_xml_files_sorted(&source.source_dir)
        .map_err(|error| read_error(&source.mod_id, error.path, error.source))?;
    let mut seen_in_mod = HashSet::<(DefKind, String)>::new();

    for xml_file in &xml_files {
        let raw = fs::read_to_string(xml_file)
            .map_err(|source_err| read_error(&source.mod_id, xml_file.clone(), source_err))?;
        let doc = Document::parse(&raw).map_err(|error| ContentLoadError {
            code: ContentErrorCode::XmlMalformed,
            message: format!("malformed XML: {error}"),
            mod_id: source.mod_id.clone(),
            file_path: xml_file.clone(),
            location: Some(SourceLocation {
                line: error.pos().row as usize,
                column: error.pos().col as usize,
            }),
        })?;
        let parser = DefParser {
            mod_id: &source.mod_id,
            file_path: xml_file,
            doc: &doc,
        };

        for (def, origin) in parser.parse_document()? {
            let key = (def.kind(), def.def_name().to_string());
            if !seen_in_mod.insert(key) {
                return Err(origin.error(
                    ContentErrorCode::DuplicateDefInMod,
                    format!(
                        "duplicate {} '{}' in mod '{}'; each mod may define a defName only once",
                        def.kind().tag(),
                        def.def_name(),
                        source.mod_id
                    ),
                ));
            }
            if merged_contains(merged, &def) {
                debug!(
                    mod_id = %source.mod_id,
                    def_type = def.kind().tag(),
                    def_name = def.def_name(),
                    "content_def_overridden"
                );
            }
            merged.insert(def, origin);
        }
    }

    Ok(xml_files.len())
}

fn merged_contains(merged: &MergedDefs, def: &ParsedDef) -> bool {
    let name = def.def_name();
    match def.kind() {
        DefKind::Segment => merged.segments.index.contains_key(name),
        DefKind::Portal => merged.portals.index.contains_key(name),
        DefKind::Interactable => merged.interactables.index.contains_key(name),
        DefKind::Vehicle => merged.vehicles.index.contains_key(name),
    }
}

fn validate_references(
    merged: MergedDefs,
    base_dir: &Path,
) -> Result<WorldDefDatabase, ContentLoadError> {
    if merged.segments.entries.is_empty() {
        return Err(ContentLoadError {
            code: ContentErrorCode::NoSegments,
            message: "world content declares no <SegmentDef>".to_string(),
            mod_id: "<merge>".to_string(),
            file_path: base_dir.to_path_buf(),
            location: None,
        });
    }

    let declared: HashSet<WorldSegment> = merged
        .segments
        .entries
        .iter()
        .map(|(def, _)| def.segment)
        .collect();
    let require = |segment: WorldSegment, what: &str, origin: &Origin| {
        if declared.contains(&segment) {
            Ok(())
        } else {
            Err(origin.error(
                ContentErrorCode::UnresolvedReference,
                format!("{what} references segment '{segment}' which has no <SegmentDef>"),
            ))
        }
    };

    for (portal, origin) in &merged.portals.entries {
        require(portal.segment, &format!("PortalDef '{}'", portal.def_name), origin)?;
        require(
            portal.destination,
            &format!("PortalDef '{}'", portal.def_name),
            origin,
        )?;
    }
    for (interactable, origin) in &merged.interactables.entries {
        let what = format!("InteractableDef '{}'", interactable.def_name);
        require(interactable.segment, &what, origin)?;
        if let InteractableActionDef::StartGame { segment } = interactable.action {
            require(segment, &what, origin)?;
        }
    }
    let mut vehicle_segments = HashSet::<WorldSegment>::new();
    for (vehicle, origin) in &merged.vehicles.entries {
        require(vehicle.segment, &format!("VehicleDef '{}'", vehicle.def_name), origin)?;
        if !vehicle_segments.insert(vehicle.segment) {
            return Err(origin.error(
                ContentErrorCode::InvalidValue,
                format!(
                    "VehicleDef '{}': segment '{}' already has a vehicle",
                    vehicle.def_name, vehicle.segment
                ),
            ));
        }
    }

    Ok(WorldDefDatabase::from_parts(
        strip_origins(merged.segments),
        strip_origins(merged.portals),
        strip_origins(merged.interactables),
        strip_origins(merged.vehicles),
    ))
}

fn strip_origins<T>(table: DefTable<T>) -> Vec<T> {
    table.entries.into_iter().map(|(def, _)| def).collect()
}

struct DefParser<'a, 'input> {
    mod_id: &'a str,
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

type Fields<'a, 'input> = HashMap<String, Node<'a, 'input>>;

impl<'a, 'input> DefParser<'a, 'input> {
    fn parse_document(&self) -> Result<Vec<(ParsedDef, Origin)>, ContentLoadError> {
        let root = self.doc.root_element();
        if root.tag_name().name() != "Defs" {
            return Err(self.error_at(
                ContentErrorCode::InvalidRoot,
                "root element must be <Defs>".to_string(),
                root,
            ));
        }

        let mut defs = Vec::new();
        for child in root.children().filter(|node| node.is_element()) {
            let def = match child.tag_name().name() {
                "SegmentDef" => ParsedDef::Segment(self.parse_segment_def(child)?),
                "PortalDef" => ParsedDef::Portal(self.parse_portal_def(child)?),
                "InteractableDef" => ParsedDef::Interactable(self.parse_interactable_def(child)?),
                "VehicleDef" => ParsedDef::Vehicle(self.parse_vehicle_def(child)?),
                other => {
                    return Err(self.error_at(
                        ContentErrorCode::UnknownDefType,
                        format!(
                            "unsupported def type <{other}>; expected SegmentDef, PortalDef, InteractableDef or VehicleDef"
                        ),
                        child,
                    ))
                }
            };
            defs.push((def, self.origin_of(child)));
        }
        Ok(defs)
    }

    fn parse_segment_def(&self, node: Node<'a, 'input>) -> Result<SegmentDef, ContentLoadError> {
        let fields = self.collect_fields(node, DefKind::Segment, &["defName", "label", "spawn", "spawnYaw"])?;
        let name_node = self.required(&fields, node, DefKind::Segment, "defName")?;
        let def_name = self.text(name_node, "defName")?;
        let segment = self.segment_token(name_node, &def_name)?;
        Ok(SegmentDef {
            segment,
            label: self.required_text(&fields, node, DefKind::Segment, "label")?,
            spawn: self.optional_vec3(&fields, "spawn")?.unwrap_or(Vec3::ZERO),
            spawn_yaw: self.optional_f32(&fields, "spawnYaw")?.unwrap_or(0.0),
            def_name,
        })
    }

    fn parse_portal_def(&self, node: Node<'a, 'input>) -> Result<PortalDef, ContentLoadError> {
        let kind = DefKind::Portal;
        let fields = self.collect_fields(
            node,
            kind,
            &[
                "defName",
                "segment",
                "destination",
                "position",
                "radius",
                "arrival",
                "arrivalYaw",
                "transit",
            ],
        )?;
        let segment = self.required_segment(&fields, node, kind, "segment")?;
        let destination = self.required_segment(&fields, node, kind, "destination")?;
        if segment == destination {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("portal destination must differ from its owning segment '{segment}'"),
                fields.get("destination").copied().unwrap_or(node),
            ));
        }
        let transit = match fields.get("transit") {
            None => PortalTransit::Animated,
            Some(&field) => match self.text(field, "transit")?.as_str() {
                "animated" => PortalTransit::Animated,
                "instant" => PortalTransit::Instant,
                value => {
                    return Err(self.error_at(
                        ContentErrorCode::InvalidValue,
                        format!("invalid transit '{value}'; allowed values: animated, instant"),
                        field,
                    ))
                }
            },
        };
        Ok(PortalDef {
            def_name: self.required_text(&fields, node, kind, "defName")?,
            segment,
            destination,
            position: self.required_vec3(&fields, node, kind, "position")?,
            radius: self.required_positive(&fields, node, kind, "radius")?,
            arrival: self.optional_vec3(&fields, "arrival")?,
            arrival_yaw: self.optional_f32(&fields, "arrivalYaw")?,
            transit,
        })
    }

    fn parse_interactable_def(
        &self,
        node: Node<'a, 'input>,
    ) -> Result<InteractableDef, ContentLoadError> {
        let kind = DefKind::Interactable;
        let fields = self.collect_fields(
            node,
            kind,
            &[
                "defName",
                "label",
                "segment",
                "position",
                "facingYaw",
                "approachOffset",
                "farRadius",
                "nearRadius",
                "openUrl",
                "copyText",
                "startGame",
                "toast",
            ],
        )?;

        let far_radius = self.required_positive(&fields, node, kind, "farRadius")?;
        let near_radius = self.required_positive(&fields, node, kind, "nearRadius")?;
        if near_radius > far_radius {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("nearRadius {near_radius} must not exceed farRadius {far_radius}"),
                fields.get("nearRadius").copied().unwrap_or(node),
            ));
        }

        Ok(InteractableDef {
            def_name: self.required_text(&fields, node, kind, "defName")?,
            label: self.required_text(&fields, node, kind, "label")?,
            segment: self.required_segment(&fields, node, kind, "segment")?,
            position: self.required_vec3(&fields, node, kind, "position")?,
            facing_yaw: self.optional_f32(&fields, "facingYaw")?.unwrap_or(0.0),
            approach_offset: self.optional_f32(&fields, "approachOffset")?.unwrap_or(0.0),
            far_radius,
            near_radius,
            action: self.parse_action(&fields, node)?,
        })
    }

    fn parse_action(
        &self,
        fields: &Fields<'a, 'input>,
        node: Node<'a, 'input>,
    ) -> Result<InteractableActionDef, ContentLoadError> {
        let present: Vec<&str> = ["openUrl", "copyText", "startGame"]
            .into_iter()
            .filter(|name| fields.contains_key(*name))
            .collect();
        if present.len() != 1 {
            return Err(self.error_at(
                if present.is_empty() {
                    ContentErrorCode::MissingField
                } else {
                    ContentErrorCode::InvalidValue
                },
                "InteractableDef needs exactly one of <openUrl>, <copyText> or <startGame>"
                    .to_string(),
                node,
            ));
        }
        if present[0] != "copyText" {
            if let Some(&toast) = fields.get("toast") {
                return Err(self.error_at(
                    ContentErrorCode::UnknownField,
                    "<toast> is only valid with <copyText>".to_string(),
                    toast,
                ));
            }
        }

        let kind = DefKind::Interactable;
        match present[0] {
            "openUrl" => {
                let field = self.required(fields, node, kind, "openUrl")?;
                let url = self.text(field, "openUrl")?;
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(self.error_at(
                        ContentErrorCode::InvalidValue,
                        format!("openUrl '{url}' must start with http:// or https://"),
                        field,
                    ));
                }
                Ok(InteractableActionDef::OpenUrl { url })
            }
            "copyText" => Ok(InteractableActionDef::CopyText {
                text: self.required_text(fields, node, kind, "copyText")?,
                toast: match fields.get("toast") {
                    Some(&field) => Some(self.text(field, "toast")?),
                    None => None,
                },
            }),
            _ => Ok(InteractableActionDef::StartGame {
                segment: self.required_segment(fields, node, kind, "startGame")?,
            }),
        }
    }

    fn parse_vehicle_def(&self, node: Node<'a, 'input>) -> Result<VehicleDef, ContentLoadError> {
        let kind = DefKind::Vehicle;
        let fields = self.collect_fields(node, kind, &["defName", "segment", "position", "yaw"])?;
        Ok(VehicleDef {
            def_name: self.required_text(&fields, node, kind, "defName")?,
            segment: self.required_segment(&fields, node, kind, "segment")?,
            position: self.required_vec3(&fields, node, kind, "position")?,
            yaw: self.optional_f32(&fields, "yaw")?.unwrap_or(0.0),
        })
    }

    fn collect_fields(
        &self,
        node: Node<'a, 'input>,
        kind: DefKind,
        allowed: &[&str],
    ) -> Result<Fields<'a, 'input>, ContentLoadError> {
        let mut fields = Fields::new();
        for field in node.children().filter(|child| child.is_element()) {
            let field_name = field.tag_name().name();
            if !allowed.contains(&field_name) {
                return Err(self.error_at(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{field_name}> in <{}>", kind.tag()),
                    field,
                ));
            }
            if fields.insert(field_name.to_string(), field).is_some() {
                return Err(self.error_at(
                    ContentErrorCode::DuplicateField,
                    format!("duplicate field <{field_name}> in <{}>", kind.tag()),
                    field,
                ));
            }
        }
        Ok(fields)
    }

    fn required(
        &self,
        fields: &Fields<'a, 'input>,
        node: Node<'a, 'input>,
        kind: DefKind,
        field_name: &str,
    ) -> Result<Node<'a, 'input>, ContentLoadError> {
        fields.get(field_name).copied().ok_or_else(|| {
            self.error_at(
                ContentErrorCode::MissingField,
                format!("missing required field <{field_name}> in <{}>", kind.tag()),
                node,
            )
        })
    }

    fn required_text(
        &self,
        fields: &Fields<'a, 'input>,
        node: Node<'a, 'input>,
        kind: DefKind,
        field_name: &str,
    ) -> Result<String, ContentLoadError> {
        let field = self.required(fields, node, kind, field_name)?;
        self.text(field, field_name)
    }

    fn text(&self, field: Node<'a, 'input>, field_name: &str) -> Result<String, ContentLoadError> {
        let value = field.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(self.error_at(
                ContentErrorCode::MissingField,
                format!("field <{field_name}> must not be empty"),
                field,
            ));
        }
        Ok(value)
    }

    fn required_segment(
        &self,
        fields: &Fields<'a, 'input>,
        node: Node<'a, 'input>,
        kind: DefKind,
        field_name: &str,
    ) -> Result<WorldSegment, ContentLoadError> {
        let field = self.required(fields, node, kind, field_name)?;
        let value = self.text(field, field_name)?;
        self.segment_token(field, &value)
    }

    fn segment_token(
        &self,
        field: Node<'a, 'input>,
        value: &str,
    ) -> Result<WorldSegment, ContentLoadError> {
        WorldSegment::from_token(value).ok_or_else(|| {
            self.error_at(
                ContentErrorCode::InvalidValue,
                format!("unknown segment '{value}'; allowed values: hub, gallery, arcade"),
                field,
            )
        })
    }

    fn required_positive(
        &self,
        fields: &Fields<'a, 'input>,
        node: Node<'a, 'input>,
        kind: DefKind,
        field_name: &str,
    ) -> Result<f32, ContentLoadError> {
        let field = self.required(fields, node, kind, field_name)?;
        let value = self.number(field, field_name)?;
        if value <= 0.0 {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} must be > 0"),
                field,
            ));
        }
        Ok(value)
    }

    fn optional_f32(
        &self,
        fields: &Fields<'a, 'input>,
        field_name: &str,
    ) -> Result<Option<f32>, ContentLoadError> {
        fields
            .get(field_name)
            .map(|&field| self.number(field, field_name))
            .transpose()
    }

    fn required_vec3(
        &self,
        fields: &Fields<'a, 'input>,
        node: Node<'a, 'input>,
        kind: DefKind,
        field_name: &str,
    ) -> Result<Vec3, ContentLoadError> {
        let field = self.required(fields, node, kind, field_name)?;
        self.vec3(field, field_name)
    }

    fn optional_vec3(
        &self,
        fields: &Fields<'a, 'input>,
        field_name: &str,
    ) -> Result<Option<Vec3>, ContentLoadError> {
        fields
            .get(field_name)
            .map(|&field| self.vec3(field, field_name))
            .transpose()
    }

    fn number(&self, field: Node<'a, 'input>, field_name: &str) -> Result<f32, ContentLoadError> {
        let value = self.text(field, field_name)?;
        match value.parse::<f32>() {
            Ok(parsed) if parsed.is_finite() => Ok(parsed),
            _ => Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}' is not a finite number"),
                field,
            )),
        }
    }

    /// Vectors are written `x,y,z`.
    fn vec3(&self, field: Node<'a, 'input>, field_name: &str) -> Result<Vec3, ContentLoadError> {
        let value = self.text(field, field_name)?;
        let parts: Vec<Option<f32>> = value
            .split(',')
            .map(|part| part.trim().parse::<f32>().ok().filter(|v| v.is_finite()))
            .collect();
        match parts.as_slice() {
            [Some(x), Some(y), Some(z)] => Ok(Vec3::new(*x, *y, *z)),
            _ => Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{field_name} '{value}' must be three finite numbers 'x,y,z'"),
                field,
            )),
        }
    }

    fn origin_of(&self, node: Node<'a, 'input>) -> Origin {
        Origin {
            mod_id: self.mod_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(self.location_of(node)),
        }
    }

    fn location_of(&self, node: Node<'a, 'input>) -> SourceLocation {
        let pos = self.doc.text_pos_at(node.range().start);
        SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }
    }

    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'a, 'input>,
    ) -> ContentLoadError {
        ContentLoadError {
            code,
            message,
            mod_id: self.mod_id.to_string(),
            file_path: self.file_path.to_path_buf(),
            location: Some(self.location_of(node)),
        }
    }
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_cached_key(|path| normalize_rel_path(path.strip_prefix(root).unwrap_or(path)));
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(mod_id: &str, path: PathBuf, source: std::io::Error) -> ContentLoadError {
    ContentLoadError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read XML content: {source}"),
        mod_id: mod_id.to_string(),
        file_path: path,
        location: None,
    }
}

fn map_discovery_error(error: DiscoveryError, root: &Path) -> ContentLoadError {
    match error {
        DiscoveryError::EnabledModMissing {
            mod_id,
            expected_dir,
        } => ContentLoadError {
            code: ContentErrorCode::Discovery,
            message: format!(
                "enabled mod '{}' not found at {}; check FOLIO_ENABLED_MODS",
                mod_id,
                expected_dir.display()
            ),
            mod_id,
            file_path: expected_dir,
            location: None,
        },
        other => ContentLoadError {
            code: ContentErrorCode::Discovery,
            message: other.to_string(),
            mod_id: "<discovery>".to_string(),
            file_path: root.to_path_buf(),
            location: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const HUB_AND_GALLERY: &str = r#"<Defs>
        <SegmentDef><defName>hub</defName><label>Hub</label><spawn>0,0,0</spawn></SegmentDef>
        <SegmentDef><defName>gallery</defName><label>Gallery</label><spawn>0,0,5</spawn><spawnYaw>3.14</spawnYaw></SegmentDef>
    </Defs>"#;

    fn setup_app_paths(root: &Path) -> AppPaths {
        let base = root.join("assets").join("base");
        let mods = root.join("mods");
        let cache = root.join("cache");
        fs::create_dir_all(&base).expect("base");
        fs::create_dir_all(&mods).expect("mods");
        AppPaths {
            root: root.to_path_buf(),
            base_content_dir: base,
            mods_dir: mods,
            cache_dir: cache,
        }
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn compile(app: &AppPaths, mods: &[&str]) -> Result<WorldDefDatabase, ContentLoadError> {
        let request = ContentRequest {
            enabled_mods: mods.iter().map(|id| id.to_string()).collect(),
        };
        compile_world_defs(app, &request).map(|compiled| compiled.database)
    }

    #[test]
    fn full_world_compiles_with_declaration_order() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(&app.base_content_dir.join("00_segments.xml"), HUB_AND_GALLERY);
        write_file(
            &app.base_content_dir.join("10_world.xml"),
            r#"<Defs>
                <PortalDef><defName>second</defName><segment>hub</segment><destination>gallery</destination><position>-20,7.5,-20</position><radius>2</radius></PortalDef>
                <PortalDef><defName>first</defName><segment>hub</segment><destination>gallery</destination><position>5,0,5</position><radius>1</radius><transit>instant</transit><arrival>1,0,1</arrival><arrivalYaw>1.5</arrivalYaw></PortalDef>
                <InteractableDef><defName>mail</defName><label>Contact</label><segment>hub</segment><position>4,0,8</position><approachOffset>1.5</approachOffset><farRadius>6</farRadius><nearRadius>2</nearRadius><copyText>hello@example.com</copyText><toast>Copied!</toast></InteractableDef>
                <VehicleDef><defName>buggy</defName><segment>hub</segment><position>-6,0,2</position><yaw>0.5</yaw></VehicleDef>
            </Defs>"#,
        );

        let db = compile(&app, &[]).expect("compile");
        assert_eq!(db.first_segment(), Some(WorldSegment::Hub));
        let portals: Vec<&PortalDef> = db.portals_in(WorldSegment::Hub).collect();
        assert_eq!(portals[0].def_name, "second");
        assert_eq!(portals[0].transit, PortalTransit::Animated);
        assert_eq!(portals[1].transit, PortalTransit::Instant);
        assert_eq!(portals[1].arrival, Some(Vec3::new(1.0, 0.0, 1.0)));
        assert_eq!(
            db.interactables_in(WorldSegment::Hub).next().map(|def| &def.action),
            Some(&InteractableActionDef::CopyText {
                text: "hello@example.com".to_string(),
                toast: Some("Copied!".to_string()),
            })
        );
        let vehicle = db.vehicle_in(WorldSegment::Hub).expect("vehicle");
        assert!((vehicle.yaw - 0.5).abs() < f32::EPSILON);
        assert!(db.vehicle_in(WorldSegment::Gallery).is_none());
    }

    #[test]
    fn later_mod_overrides_in_declaration_slot() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(&app.base_content_dir.join("segments.xml"), HUB_AND_GALLERY);
        write_file(
            &app.mods_dir.join("moda").join("hub.xml"),
            r#"<Defs><SegmentDef><defName>hub</defName><label>Modded Hub</label></SegmentDef></Defs>"#,
        );

        let db = compile(&app, &["moda"]).expect("compile");
        let labels: Vec<&str> = db.segments().iter().map(|def| def.label.as_str()).collect();
        assert_eq!(labels, vec!["Modded Hub", "Gallery"]);
    }

    #[test]
    fn same_mod_duplicate_def_errors() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(&app.base_content_dir.join("a.xml"), HUB_AND_GALLERY);
        write_file(
            &app.base_content_dir.join("b.xml"),
            r#"<Defs><SegmentDef><defName>hub</defName><label>Again</label></SegmentDef></Defs>"#,
        );
        let err = compile(&app, &[]).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateDefInMod);
        assert!(err.file_path.ends_with("b.xml"));
    }

    #[test]
    fn missing_def_name_reports_mod_file_and_location() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.base_content_dir.join("world.xml"),
            r#"<Defs><SegmentDef><label>X</label></SegmentDef></Defs>"#,
        );
        let err = compile(&app, &[]).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert_eq!(err.mod_id, "base");
        assert!(err
            .file_path
            .ends_with(Path::new("assets").join("base").join("world.xml")));
        assert!(err.location.is_some());
    }

    #[test]
    fn unknown_field_and_duplicate_field_error() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.base_content_dir.join("world.xml"),
            r#"<Defs><SegmentDef><defName>hub</defName><label>A</label><mood>Happy</mood></SegmentDef></Defs>"#,
        );
        assert_eq!(compile(&app, &[]).expect_err("err").code, ContentErrorCode::UnknownField);

        write_file(
            &app.base_content_dir.join("world.xml"),
            r#"<Defs><SegmentDef><defName>hub</defName><label>A</label><label>B</label></SegmentDef></Defs>"#,
        );
        assert_eq!(
            compile(&app, &[]).expect_err("err").code,
            ContentErrorCode::DuplicateField
        );
    }

    #[test]
    fn malformed_xml_and_wrong_root_are_reported() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.base_content_dir.join("world.xml"),
            r#"<Defs><SegmentDef><defName>hub</defName></Defs>"#,
        );
        let err = compile(&app, &[]).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());

        write_file(&app.base_content_dir.join("world.xml"), r#"<World/>"#);
        assert_eq!(compile(&app, &[]).expect_err("err").code, ContentErrorCode::InvalidRoot);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(&app.base_content_dir.join("00.xml"), HUB_AND_GALLERY);
        let cases = [
            r#"<PortalDef><defName>p</defName><segment>moon</segment><destination>hub</destination><position>0,0,0</position><radius>1</radius></PortalDef>"#,
            r#"<PortalDef><defName>p</defName><segment>hub</segment><destination>gallery</destination><position>0,0</position><radius>1</radius></PortalDef>"#,
            r#"<PortalDef><defName>p</defName><segment>hub</segment><destination>gallery</destination><position>0,0,0</position><radius>-1</radius></PortalDef>"#,
            r#"<PortalDef><defName>p</defName><segment>hub</segment><destination>hub</destination><position>0,0,0</position><radius>1</radius></PortalDef>"#,
            r#"<InteractableDef><defName>i</defName><label>I</label><segment>hub</segment><position>0,0,0</position><farRadius>2</farRadius><nearRadius>3</nearRadius><openUrl>https://example.com</openUrl></InteractableDef>"#,
            r#"<InteractableDef><defName>i</defName><label>I</label><segment>hub</segment><position>0,0,0</position><farRadius>2</farRadius><nearRadius>1</nearRadius><openUrl>file:///etc</openUrl></InteractableDef>"#,
            r#"<InteractableDef><defName>i</defName><label>I</label><segment>hub</segment><position>0,0,0</position><farRadius>2</farRadius><nearRadius>1</nearRadius><openUrl>https://a</openUrl><startGame>gallery</startGame></InteractableDef>"#,
        ];
        for case in cases {
            write_file(
                &app.base_content_dir.join("10.xml"),
                &format!("<Defs>{case}</Defs>"),
            );
            let err = compile(&app, &[]).expect_err(case);
            assert_eq!(err.code, ContentErrorCode::InvalidValue, "{case}");
        }
    }

    #[test]
    fn unresolved_segment_reference_errors() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.base_content_dir.join("world.xml"),
            r#"<Defs>
                <SegmentDef><defName>hub</defName><label>Hub</label></SegmentDef>
                <InteractableDef><defName>play</defName><label>Play</label><segment>hub</segment><position>0,0,0</position><farRadius>4</farRadius><nearRadius>4</nearRadius><startGame>arcade</startGame></InteractableDef>
            </Defs>"#,
        );
        let err = compile(&app, &[]).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnresolvedReference);
        assert!(err.message.contains("arcade"));
    }

    #[test]
    fn second_vehicle_in_segment_errors() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        write_file(
            &app.base_content_dir.join("world.xml"),
            r#"<Defs>
                <SegmentDef><defName>hub</defName><label>Hub</label></SegmentDef>
                <VehicleDef><defName>a</defName><segment>hub</segment><position>0,0,0</position></VehicleDef>
                <VehicleDef><defName>b</defName><segment>hub</segment><position>3,0,0</position></VehicleDef>
            </Defs>"#,
        );
        assert_eq!(compile(&app, &[]).expect_err("err").code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn empty_world_and_missing_mod_error() {
        let temp = TempDir::new().expect("temp");
        let app = setup_app_paths(temp.path());
        assert_eq!(compile(&app, &[]).expect_err("err").code, ContentErrorCode::NoSegments);

        let err = compile(&app, &["ghost"]).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::Discovery);
        assert_eq!(err.mod_id, "ghost");
    }
}
