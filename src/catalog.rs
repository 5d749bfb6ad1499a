//! Well-known simulator variables.
//!
//! Descriptor constructors for commonly tracked quantities, matching the
//! names the native subscription API exposes. Indexed constructors take the
//! 1-based instrument number.

use crate::types::FieldDescriptor;
use crate::units::Unit;

pub fn apu_switch() -> FieldDescriptor {
    FieldDescriptor::variable("APU SWITCH", Unit::Bool)
}

pub fn on_any_runway() -> FieldDescriptor {
    FieldDescriptor::variable("ON ANY RUNWAY", Unit::Bool)
}

pub fn plane_in_parking_state() -> FieldDescriptor {
    FieldDescriptor::variable("PLANE IN PARKING STATE", Unit::Bool)
}

pub fn external_power_on() -> FieldDescriptor {
    FieldDescriptor::variable("EXTERNAL POWER ON", Unit::Bool).with_index(1)
}

pub fn pushback_attached() -> FieldDescriptor {
    FieldDescriptor::variable("PUSHBACK ATTACHED", Unit::Bool)
}

pub fn gear_is_on_ground() -> FieldDescriptor {
    FieldDescriptor::variable("GEAR IS ON GROUND", Unit::Bool)
}

pub fn light_landing_on() -> FieldDescriptor {
    FieldDescriptor::variable("LIGHT LANDING ON", Unit::Bool)
}

pub fn eng_combustion(engine: u32) -> FieldDescriptor {
    FieldDescriptor::variable("ENG COMBUSTION:index", Unit::Bool).with_index(engine)
}

pub fn turb_eng_n1(engine: u32) -> FieldDescriptor {
    FieldDescriptor::variable("TURB ENG N1:index", Unit::Percent).with_index(engine)
}

pub fn turb_eng_n2(engine: u32) -> FieldDescriptor {
    FieldDescriptor::variable("TURB ENG N2:index", Unit::Percent).with_index(engine)
}

pub fn electrical_master_battery(battery: u32) -> FieldDescriptor {
    FieldDescriptor::variable("ELECTRICAL MASTER BATTERY:index", Unit::Bool)
        .with_index(battery)
        .settable()
}

pub fn plane_touchdown_bank_degrees() -> FieldDescriptor {
    FieldDescriptor::variable("PLANE TOUCHDOWN BANK DEGREES", Unit::Degrees)
}

pub fn plane_touchdown_pitch_degrees() -> FieldDescriptor {
    FieldDescriptor::variable("PLANE TOUCHDOWN PITCH DEGREES", Unit::Degrees)
}

pub fn plane_touchdown_latitude() -> FieldDescriptor {
    FieldDescriptor::variable("PLANE TOUCHDOWN LATITUDE", Unit::RadDeg)
}

pub fn plane_touchdown_longitude() -> FieldDescriptor {
    FieldDescriptor::variable("PLANE TOUCHDOWN LONGITUDE", Unit::RadDeg)
}
