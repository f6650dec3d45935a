//! Dormand–Prince 5(4) coefficients.
//!
//! Dormand, J. R.; Prince, P. J. (1980). "A family of embedded Runge-Kutta formulae".
//! Journal of Computational and Applied Mathematics 6 (1): 19–26.
//!
//! The seventh stage is evaluated at the fifth-order solution, which is what gives the pair its
//! first-same-as-last property; it is still listed explicitly so the error estimate can use it.

/// Number of stages.
pub const STAGES: usize = 7;

/// Order of the propagated solution.
pub const ORDER: u8 = 5;

/// Order of the embedded solution used for the error estimate.
pub const EMBEDDED_ORDER: u8 = 4;

/// Nodes `c_i`.
pub const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

/// Runge–Kutta matrix, row `i` holds `a_ij` for `j < i`.
pub const A: [[f64; STAGES - 1]; STAGES] = [
    [0.0; STAGES - 1],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

/// Fifth-order weights.
pub const B: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

/// Difference between the fifth- and fourth-order weights.
pub const B_ERR: [f64; STAGES] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];
