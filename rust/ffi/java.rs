// Copyright (c) SandboxAQ. All rights reserved.
// SPDX-License-Identifier: AGPL-3.0-only

//! `GoBackend` native methods.

use jni::objects::{JClass, JString};
use jni::strings::JavaStr;
use jni::sys::{jint, jlong, jstring};
use jni::JNIEnv;

use crate::dispatch::Dispatcher;
use crate::engine::Libwg;
use crate::marshal::{text_or_null, HostString, Lent, StringSource};
use crate::support::{self, logging};
use crate::Result;

/// The dispatcher over the linked engine.
static DISPATCHER: Dispatcher<Libwg> = Dispatcher::new(Libwg);

/// Implements [`StringSource`] for [`JavaStr`].
///
/// The modified UTF-8 bytes stay pinned until the [`JavaStr`] is dropped,
/// which releases them.
impl StringSource for JavaStr<'_, '_, '_> {
    fn lend(&self) -> Result<Lent> {
        Ok(Lent::from_bytes(self.to_bytes()))
    }

    fn give_back(&self, _lent: Lent) {}
}

/// Pins a string argument of the current call.
fn java_string<'local, 'other_local, 'obj_ref>(
    env: &mut JNIEnv<'local>,
    s: &'obj_ref JString<'other_local>,
) -> HostString<JavaStr<'local, 'other_local, 'obj_ref>> {
    if s.is_null() {
        return HostString::Unavailable("null string".into());
    }
    match env.get_string(s) {
        Ok(pinned) => HostString::Available(pinned),
        Err(e) => HostString::Unavailable(format!("cannot pin string: {e}")),
    }
}

/// `int awgTurnOn(String ifName, int tunFd, String settings, String auxConfig)`
#[no_mangle]
pub extern "system" fn Java_org_amnezia_awg_backend_GoBackend_awgTurnOn<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    ifname: JString<'local>,
    tun_fd: jint,
    settings: JString<'local>,
    aux: JString<'local>,
) -> jint {
    logging::init();
    let ifname = java_string(&mut env, &ifname);
    let settings = java_string(&mut env, &settings);
    let aux = java_string(&mut env, &aux);
    let handle = DISPATCHER.host_turn_on(&ifname, support::to_c_int(tun_fd), &settings, &aux);
    support::to_i32(handle)
}

/// `void awgSetConfig(int handle, String settings, String auxConfig)`
#[no_mangle]
pub extern "system" fn Java_org_amnezia_awg_backend_GoBackend_awgSetConfig<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jint,
    settings: JString<'local>,
    aux: JString<'local>,
) {
    logging::init();
    let settings = java_string(&mut env, &settings);
    let aux = java_string(&mut env, &aux);
    DISPATCHER.host_set_config(support::to_c_int(handle), &settings, &aux);
}

/// `void awgTurnOff(int handle)`
#[no_mangle]
pub extern "system" fn Java_org_amnezia_awg_backend_GoBackend_awgTurnOff(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jint,
) {
    logging::init();
    DISPATCHER.turn_off(support::to_c_int(handle));
}

/// `int awgGetSocketV4(int handle)`
#[no_mangle]
pub extern "system" fn Java_org_amnezia_awg_backend_GoBackend_awgGetSocketV4(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jint,
) -> jint {
    logging::init();
    support::to_i32(DISPATCHER.socket_v4(support::to_c_int(handle)))
}

/// `int awgGetSocketV6(int handle)`
#[no_mangle]
pub extern "system" fn Java_org_amnezia_awg_backend_GoBackend_awgGetSocketV6(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jint,
) -> jint {
    logging::init();
    support::to_i32(DISPATCHER.socket_v6(support::to_c_int(handle)))
}

/// `String awgGetConfig(int handle)`
#[no_mangle]
pub extern "system" fn Java_org_amnezia_awg_backend_GoBackend_awgGetConfig(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jint,
) -> jstring {
    logging::init();
    let dump = DISPATCHER.config(support::to_c_int(handle));
    text_or_null(dump, |text| env.new_string(text).map(JString::into_raw))
}

/// `String awgVersion()`
#[no_mangle]
pub extern "system" fn Java_org_amnezia_awg_backend_GoBackend_awgVersion(
    mut env: JNIEnv<'_>,
    _class: JClass<'_>,
) -> jstring {
    logging::init();
    let version = DISPATCHER.version();
    text_or_null(version, |text| env.new_string(text).map(JString::into_raw))
}

/// `long awgGetLastHandshake(int handle)`
#[no_mangle]
pub extern "system" fn Java_org_amnezia_awg_backend_GoBackend_awgGetLastHandshake(
    _env: JNIEnv<'_>,
    _class: JClass<'_>,
    handle: jint,
) -> jlong {
    logging::init();
    DISPATCHER.last_handshake(support::to_c_int(handle))
}
