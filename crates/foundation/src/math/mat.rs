use super::Vec3;

/// Column-major 4x4 matrix, laid out the way WGSL expects it.
pub type Mat4 = [[f32; 4]; 4];

pub const MAT4_IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

pub fn mat4_mul(a: Mat4, b: Mat4) -> Mat4 {
    // Column-major matrix multiply: c = a * b
    let mut c = [[0.0f32; 4]; 4];
    for col in 0..4 {
        for row in 0..4 {
            c[col][row] = a[0][row] * b[col][0]
                + a[1][row] * b[col][1]
                + a[2][row] * b[col][2]
                + a[3][row] * b[col][3];
        }
    }
    c
}

pub fn mat4_perspective_rh_z0(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Mat4 {
    let f = 1.0 / (0.5 * fov_y_rad).tan();
    let m00 = (f / aspect) as f32;
    let m11 = f as f32;
    let m22 = (far / (near - far)) as f32;
    let m23 = ((near * far) / (near - far)) as f32;

    // RH, depth range [0, 1].
    [
        [m00, 0.0, 0.0, 0.0],
        [0.0, m11, 0.0, 0.0],
        [0.0, 0.0, m22, -1.0],
        [0.0, 0.0, m23, 0.0],
    ]
}

pub fn mat4_look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let f = (target - eye).normalize();
    let s = f.cross(up).normalize();
    let u = s.cross(f);

    let ex = -s.dot(eye);
    let ey = -u.dot(eye);
    let ez = f.dot(eye);

    [
        [s.x as f32, u.x as f32, (-f.x) as f32, 0.0],
        [s.y as f32, u.y as f32, (-f.y) as f32, 0.0],
        [s.z as f32, u.z as f32, (-f.z) as f32, 0.0],
        [ex as f32, ey as f32, ez as f32, 1.0],
    ]
}

pub fn mat4_translation(t: Vec3) -> Mat4 {
    let mut m = MAT4_IDENTITY;
    m[3] = [t.x as f32, t.y as f32, t.z as f32, 1.0];
    m
}

pub fn mat4_scale(s: Vec3) -> Mat4 {
    [
        [s.x as f32, 0.0, 0.0, 0.0],
        [0.0, s.y as f32, 0.0, 0.0],
        [0.0, 0.0, s.z as f32, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Rotation from Euler angles in radians, applied X then Y then Z.
pub fn mat4_rotation_xyz(r: Vec3) -> Mat4 {
    let (sx, cx) = (r.x.sin() as f32, r.x.cos() as f32);
    let (sy, cy) = (r.y.sin() as f32, r.y.cos() as f32);
    let (sz, cz) = (r.z.sin() as f32, r.z.cos() as f32);

    let rx: Mat4 = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, cx, sx, 0.0],
        [0.0, -sx, cx, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let ry: Mat4 = [
        [cy, 0.0, -sy, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [sy, 0.0, cy, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    let rz: Mat4 = [
        [cz, sz, 0.0, 0.0],
        [-sz, cz, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];
    mat4_mul(rz, mat4_mul(ry, rx))
}

/// Rotation from a unit quaternion `[x, y, z, w]`.
pub fn mat4_from_quat(q: [f64; 4]) -> Mat4 {
    let [x, y, z, w] = q;
    let (xx, yy, zz) = (x * x, y * y, z * z);
    let (xy, xz, yz) = (x * y, x * z, y * z);
    let (wx, wy, wz) = (w * x, w * y, w * z);
    [
        [
            (1.0 - 2.0 * (yy + zz)) as f32,
            (2.0 * (xy + wz)) as f32,
            (2.0 * (xz - wy)) as f32,
            0.0,
        ],
        [
            (2.0 * (xy - wz)) as f32,
            (1.0 - 2.0 * (xx + zz)) as f32,
            (2.0 * (yz + wx)) as f32,
            0.0,
        ],
        [
            (2.0 * (xz + wy)) as f32,
            (2.0 * (yz - wx)) as f32,
            (1.0 - 2.0 * (xx + yy)) as f32,
            0.0,
        ],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

pub fn mat4_transform_point(m: &Mat4, p: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0f32; 3];
    for (row, o) in out.iter_mut().enumerate() {
        *o = m[0][row] * p[0] + m[1][row] * p[1] + m[2][row] * p[2] + m[3][row];
    }
    out
}

/// Transforms a direction by the upper 3x3 (no translation); not renormalized.
pub fn mat4_transform_dir(m: &Mat4, d: [f32; 3]) -> [f32; 3] {
    let mut out = [0.0f32; 3];
    for (row, o) in out.iter_mut().enumerate() {
        *o = m[0][row] * d[0] + m[1][row] * d[1] + m[2][row] * d[2];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close3(a: [f32; 3], b: [f32; 3]) {
        for i in 0..3 {
            assert!((a[i] - b[i]).abs() < 1e-5, "expected {b:?}, got {a:?}");
        }
    }

    #[test]
    fn identity_is_neutral() {
        let t = mat4_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mat4_mul(MAT4_IDENTITY, t), t);
        assert_eq!(mat4_mul(t, MAT4_IDENTITY), t);
    }

    #[test]
    fn translate_then_scale_order() {
        let m = mat4_mul(
            mat4_translation(Vec3::new(1.0, 0.0, 0.0)),
            mat4_scale(Vec3::new(2.0, 2.0, 2.0)),
        );
        assert_close3(mat4_transform_point(&m, [1.0, 1.0, 1.0]), [3.0, 2.0, 2.0]);
    }

    #[test]
    fn rotation_about_y_maps_x_to_minus_z() {
        let m = mat4_rotation_xyz(Vec3::new(0.0, std::f64::consts::FRAC_PI_2, 0.0));
        assert_close3(mat4_transform_point(&m, [1.0, 0.0, 0.0]), [0.0, 0.0, -1.0]);
    }

    #[test]
    fn quat_identity_is_identity() {
        let m = mat4_from_quat([0.0, 0.0, 0.0, 1.0]);
        assert_eq!(m, MAT4_IDENTITY);
    }

    #[test]
    fn look_at_puts_target_on_negative_z() {
        let view = mat4_look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::UP);
        assert_close3(mat4_transform_point(&view, [0.0, 0.0, 0.0]), [0.0, 0.0, -5.0]);
    }
}
