use glam::{Mat4, Vec2, Vec3};

/// A named UV channel with one coordinate per face corner.
#[derive(Debug, Clone, PartialEq)]
pub struct UvLayer {
    pub name: String,
    pub coords: Vec<Vec2>,
}

impl UvLayer {
    pub fn face_uvs(&self, face: usize) -> [Vec2; 3] {
        let base = face * 3;
        [self.coords[base], self.coords[base + 1], self.coords[base + 2]]
    }

    pub fn set_face_uvs(&mut self, face: usize, uvs: [Vec2; 3]) {
        let base = face * 3;
        self.coords[base..base + 3].copy_from_slice(&uvs);
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    face_selection: Vec<bool>,
    uv_layers: Vec<UvLayer>,
    active_uv: Option<usize>,
    active_render_uv: Option<usize>,
}

impl MeshData {
    pub fn new(positions: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        let face_selection = vec![false; faces.len()];
        Self {
            positions,
            faces,
            face_selection,
            uv_layers: Vec::new(),
            active_uv: None,
            active_render_uv: None,
        }
    }

    pub fn quad() -> Self {
        Self::new(
            vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    /// Unit cube centered on the origin, outward-facing triangles.
    pub fn cube() -> Self {
        let positions = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        let faces = vec![
            // -Z
            [0, 2, 1],
            [0, 3, 2],
            // +Z
            [4, 5, 6],
            [4, 6, 7],
            // -Y
            [0, 1, 5],
            [0, 5, 4],
            // +Y
            [3, 7, 6],
            [3, 6, 2],
            // -X
            [0, 4, 7],
            [0, 7, 3],
            // +X
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self::new(positions, faces)
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn num_corners(&self) -> usize {
        self.faces.len() * 3
    }

    pub fn face_positions(&self, face: usize) -> [Vec3; 3] {
        self.faces[face].map(|index| self.positions[index as usize])
    }

    /// Unnormalized face normal; zero for degenerate faces.
    pub fn face_normal(&self, face: usize) -> Vec3 {
        let [a, b, c] = self.face_positions(face);
        (b - a).cross(c - a)
    }

    pub fn face_area(&self, face: usize) -> f32 {
        self.face_normal(face).length() * 0.5
    }

    pub fn select_all_faces(&mut self, selected: bool) {
        self.face_selection.clear();
        self.face_selection.resize(self.faces.len(), selected);
    }

    pub fn is_face_selected(&self, face: usize) -> bool {
        self.face_selection.get(face).copied().unwrap_or(false)
    }

    pub fn selected_faces(&self) -> Vec<usize> {
        (0..self.faces.len())
            .filter(|&face| self.is_face_selected(face))
            .collect()
    }

    pub fn uv_layers(&self) -> &[UvLayer] {
        &self.uv_layers
    }

    pub fn uv_layer_index(&self, name: &str) -> Option<usize> {
        self.uv_layers.iter().position(|layer| layer.name == name)
    }

    pub fn uv_layer(&self, name: &str) -> Option<&UvLayer> {
        self.uv_layers.iter().find(|layer| layer.name == name)
    }

    /// Appends a UV layer, initialized from the active layer when there is one.
    /// The first layer of a mesh becomes active and render-active.
    pub fn add_uv_layer(&mut self, name: impl Into<String>) -> usize {
        let coords = match self.active_uv_layer() {
            Some(active) => active.coords.clone(),
            None => vec![Vec2::ZERO; self.num_corners()],
        };

        self.uv_layers.push(UvLayer {
            name: name.into(),
            coords,
        });

        let index = self.uv_layers.len() - 1;
        if self.active_uv.is_none() {
            self.active_uv = Some(index);
        }
        if self.active_render_uv.is_none() {
            self.active_render_uv = Some(index);
        }
        index
    }

    /// Replaces a layer's coordinates; the count must match the corner count.
    pub fn set_uv_coords(&mut self, index: usize, coords: Vec<Vec2>) -> bool {
        let corners = self.num_corners();
        match self.uv_layers.get_mut(index) {
            Some(layer) if coords.len() == corners => {
                layer.coords = coords;
                true
            }
            _ => false,
        }
    }

    pub fn active_uv_index(&self) -> Option<usize> {
        self.active_uv
    }

    pub fn active_render_uv_index(&self) -> Option<usize> {
        self.active_render_uv
    }

    pub fn set_active_uv_index(&mut self, index: usize) -> bool {
        if index >= self.uv_layers.len() {
            return false;
        }
        self.active_uv = Some(index);
        true
    }

    pub fn set_active_render_uv_index(&mut self, index: usize) -> bool {
        if index >= self.uv_layers.len() {
            return false;
        }
        self.active_render_uv = Some(index);
        true
    }

    pub fn active_uv_layer(&self) -> Option<&UvLayer> {
        self.active_uv.and_then(|index| self.uv_layers.get(index))
    }

    pub fn active_uv_layer_mut(&mut self) -> Option<&mut UvLayer> {
        self.active_uv.and_then(|index| self.uv_layers.get_mut(index))
    }

    /// Appends `other` with its positions mapped through `matrix`.
    ///
    /// UV layers are matched by name. Layers this mesh lacks are appended,
    /// and corners without a matching source layer are zero-filled.
    pub fn append(&mut self, other: &MeshData, matrix: Mat4) {
        let vertex_offset = self.positions.len() as u32;
        let corner_count = self.num_corners();

        for layer in other.uv_layers() {
            if self.uv_layer_index(&layer.name).is_none() {
                self.uv_layers.push(UvLayer {
                    name: layer.name.clone(),
                    coords: vec![Vec2::ZERO; corner_count],
                });
            }
        }

        for layer in &mut self.uv_layers {
            match other.uv_layer(&layer.name) {
                Some(source) => layer.coords.extend_from_slice(&source.coords),
                None => layer
                    .coords
                    .extend(std::iter::repeat(Vec2::ZERO).take(other.num_corners())),
            }
        }

        self.positions.extend(
            other
                .positions
                .iter()
                .map(|&position| matrix.transform_point3(position)),
        );
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|face| face.map(|index| index + vertex_offset)),
        );
        self.face_selection
            .extend(std::iter::repeat(false).take(other.num_faces()));

        if self.active_uv.is_none() && !self.uv_layers.is_empty() {
            self.active_uv = Some(0);
        }
        if self.active_render_uv.is_none() && !self.uv_layers.is_empty() {
            self.active_render_uv = Some(0);
        }
    }
}
