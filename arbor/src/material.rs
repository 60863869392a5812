use bytemuck::{Pod, Zeroable};
use glam::{vec3, Vec3};

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    albedo: Vec3,
    emissive: Vec3,
    metallic: f32,
    roughness: f32,
    transmission: f32,
    ior: f32,
}

impl Material {
    pub fn with_albedo(mut self, albedo: Vec3) -> Self {
        self.albedo = albedo;
        self
    }

    pub fn with_emissive(mut self, emissive: Vec3) -> Self {
        self.emissive = emissive;
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic;
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_transmission(mut self, transmission: f32) -> Self {
        self.transmission = transmission;
        self
    }

    pub fn with_ior(mut self, ior: f32) -> Self {
        self.ior = ior;
        self
    }

    pub(crate) fn build(&self) -> MaterialRecord {
        MaterialRecord {
            albedo: self.albedo,
            metallic: self.metallic,
            emissive: self.emissive,
            roughness: self.roughness,
            transmission: self.transmission,
            ior: self.ior,
            _pad0: 0.0,
            _pad1: 0.0,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        // Defaults more-or-less follow glTF's metallic-roughness model

        Self {
            albedo: vec3(1.0, 1.0, 1.0),
            emissive: Vec3::ZERO,
            metallic: 0.0,
            roughness: 0.5,
            transmission: 0.0,
            ior: 1.5,
        }
    }
}

/// Flattened material, as stored in the acceleration's material table.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialRecord {
    pub albedo: Vec3,
    pub metallic: f32,
    pub emissive: Vec3,
    pub roughness: f32,
    pub transmission: f32,
    pub ior: f32,
    pub _pad0: f32,
    pub _pad1: f32,
}
