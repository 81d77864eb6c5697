//! Build the output beams from the screen beam and the sampled offsets
use crate::{
    beam::Beam,
    error::{HyResult, HybridError},
    ray::Plane,
};

use super::calculation::PlaneCalculation;

fn check_offsets(offsets: &[f64], good_rays: usize, plane: Plane) -> HyResult<()> {
    if offsets.len() == good_rays {
        Ok(())
    } else {
        Err(HybridError::Beam(format!(
            "plane {plane}: {} offsets for {good_rays} good rays",
            offsets.len()
        )))
    }
}

/// Beam at the image plane with the far field (angle) corrections applied.
///
/// The direction of every good ray is kicked by `atan(offset)` in each corrected plane, then all rays (the lost
/// ones as well) are propagated over `distance`. The returned beam has no history.
///
/// # Errors
///
/// This function will return an error if the number of offsets does not match the number of good rays or a ray
/// cannot be retraced.
pub fn far_field_beam(
    screen: &Beam,
    planes: &[&PlaneCalculation],
    distance: f64,
) -> HyResult<Beam> {
    let good_rays = screen.number_of_good_rays();
    for plane in planes {
        check_offsets(&plane.far_field_offsets, good_rays, plane.plane)?;
    }
    let mut beam = screen.duplicate(true, false);
    for (j, ray) in beam.rays_mut().iter_mut().filter(|r| r.valid()).enumerate() {
        let (mut angle_x, mut angle_z) = (ray.angle_x(), ray.angle_z());
        for plane in planes {
            let kick = plane.far_field_offsets[j].atan();
            match plane.plane {
                Plane::X => angle_x += kick,
                Plane::Z => angle_z += kick,
            }
        }
        ray.set_direction_from_tangents(angle_x.tan(), angle_z.tan())?;
    }
    beam.retrace(distance)?;
    Ok(beam)
}

/// Beam at the image plane with the near field (position) corrections applied.
///
/// Starts from the far field beam: the positions of the good rays in the corrected planes are replaced by
/// `offset + d * (x_screen / f + tan(angle))` with the screen position and angle of the ray. Without focal length
/// (plane wave) the term `x_screen / f` vanishes. Directions are kept from the far field beam.
///
/// # Errors
///
/// This function will return an error if the number of offsets does not match the number of good rays.
pub fn near_field_beam(
    screen: &Beam,
    far_field: &Beam,
    planes: &[&PlaneCalculation],
) -> HyResult<Beam> {
    let good_rays = screen.number_of_good_rays();
    for plane in planes {
        check_offsets(&plane.near_field_offsets, good_rays, plane.plane)?;
    }
    let mut beam = far_field.duplicate(true, false);
    let screen_rays = screen.rays().iter().filter(|r| r.valid());
    let image_rays = beam.rays_mut().iter_mut().filter(|r| r.valid());
    for (j, (screen_ray, ray)) in screen_rays.zip(image_rays).enumerate() {
        let screen_position = screen_ray.position();
        let mut position = ray.position();
        for plane in planes {
            let d = plane.distance;
            let (x, angle) = match plane.plane {
                Plane::X => (screen_position.x, screen_ray.angle_x()),
                Plane::Z => (screen_position.z, screen_ray.angle_z()),
            };
            let focus = plane.near_field_focal_length.map_or(0.0, |f| x / f);
            let value = d.mul_add(focus + angle.tan(), plane.near_field_offsets[j]);
            match plane.plane {
                Plane::X => position.x = value,
                Plane::Z => position.z = value,
            }
        }
        ray.set_position(position);
    }
    Ok(beam)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ray::Ray, scaled::ScaledArray};
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;
    use nalgebra::{vector, Vector3};

    fn screen() -> Beam {
        let mut beam = Beam::default();
        beam.add_ray(Ray::new(1, vector![0.1, 0.0, 0.2], Vector3::y(), 1.0e8).unwrap());
        let mut lost = Ray::new(2, vector![0.5, 0.0, 0.5], Vector3::y(), 1.0e8).unwrap();
        lost.set_lost();
        beam.add_ray(lost);
        beam.add_ray(Ray::new(3, vector![-0.1, 0.0, -0.2], vector![0.0, 1.0, 0.01], 1.0e8).unwrap());
        beam
    }
    fn plane(plane: Plane, far_field: Vec<f64>, near_field: Vec<f64>) -> PlaneCalculation {
        PlaneCalculation {
            plane,
            cut: true,
            histogram: ScaledArray::zeros(2, -1.0, 1.0).unwrap(),
            extent: (-1.0, 1.0),
            distance: 100.0,
            near_field_focal_length: Some(50.0),
            far_field_focal_length: 10.0,
            fft_size: 256,
            scale_factor: 1.0,
            figure_error_slice: None,
            rms_slope: 0.0,
            far_field: None,
            near_field: None,
            far_field_offsets: far_field,
            near_field_offsets: near_field,
        }
    }
    #[test]
    fn far_field() {
        let screen = screen();
        let z = plane(Plane::Z, vec![1.0e-3, -1.0e-3], vec![]);
        let beam = far_field_beam(&screen, &[&z], 100.0).unwrap();
        assert_eq!(beam.number_of_rays(), 3);
        assert!(beam.history().is_empty());
        let rays = beam.rays();
        assert_abs_diff_eq!(rays[0].angle_z(), 1.0e-3_f64.atan(), epsilon = 1e-15);
        assert_abs_diff_eq!(rays[0].position().z, 0.2 + 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(rays[0].position().x, 0.1, epsilon = 1e-15);
        // lost rays are only retraced
        assert!(!rays[1].valid());
        assert_abs_diff_eq!(rays[1].position().z, 0.5, epsilon = 1e-15);
        let expected = (0.01_f64.atan() - 1.0e-3_f64.atan()).tan();
        assert_abs_diff_eq!(rays[2].position().z, -0.2 + 100.0 * expected, epsilon = 1e-12);
        for ray in rays {
            assert_abs_diff_eq!(ray.direction().norm(), 1.0, epsilon = 1e-12);
        }
    }
    #[test]
    fn offsets_mismatch() {
        let screen = screen();
        let z = plane(Plane::Z, vec![1.0e-3], vec![]);
        assert_matches!(
            far_field_beam(&screen, &[&z], 100.0),
            Err(HybridError::Beam(_))
        );
        let z = plane(Plane::Z, vec![0.0, 0.0], vec![0.0]);
        let far_field = far_field_beam(&screen, &[&z], 100.0).unwrap();
        assert!(near_field_beam(&screen, &far_field, &[&z]).is_err());
    }
    #[test]
    fn near_field() {
        let screen = screen();
        let x = plane(Plane::X, vec![0.0, 0.0], vec![0.01, 0.02]);
        let mut z = plane(Plane::Z, vec![0.0, 0.0], vec![-0.01, 0.0]);
        z.near_field_focal_length = None;
        let far_field = far_field_beam(&screen, &[&x, &z], 100.0).unwrap();
        let beam = near_field_beam(&screen, &far_field, &[&x, &z]).unwrap();
        let rays = beam.rays();
        assert_abs_diff_eq!(rays[0].position().x, 0.01 + 100.0 * 0.1 / 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rays[0].position().z, -0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(rays[2].position().x, 0.02 - 100.0 * 0.1 / 50.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rays[2].position().z, 100.0 * 0.01, epsilon = 1e-12);
        assert_eq!(rays[1].position(), far_field.rays()[1].position());
        assert_eq!(rays[2].direction(), far_field.rays()[2].direction());
    }
}
