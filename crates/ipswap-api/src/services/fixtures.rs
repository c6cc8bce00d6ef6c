//! ARM documents shared by the service unit tests

use crate::azure::models::{NetworkInterface, PublicIpAddress, VirtualMachine};
use serde_json::json;

pub const SUB: &str = "sub-1";

pub fn nic_id(rg: &str, name: &str) -> String {
    format!("/subscriptions/{SUB}/resourceGroups/{rg}/providers/Microsoft.Network/networkInterfaces/{name}")
}

pub fn public_ip_id(rg: &str, name: &str) -> String {
    format!("/subscriptions/{SUB}/resourceGroups/{rg}/providers/Microsoft.Network/publicIPAddresses/{name}")
}

pub fn vm_id(rg: &str, name: &str) -> String {
    format!("/subscriptions/{SUB}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachines/{name}")
}

/// A NIC with one IP configuration; `vm` and `public_ip` are names in `rg`
pub fn nic(rg: &str, name: &str, vm: Option<&str>, public_ip: Option<&str>) -> NetworkInterface {
    let mut properties = json!({
        "privateIPAddress": "10.0.0.4",
        "subnet": { "id": format!("/subscriptions/{SUB}/resourceGroups/{rg}/providers/Microsoft.Network/virtualNetworks/vnet/subnets/default") }
    });
    if let Some(ip) = public_ip {
        properties["publicIPAddress"] = json!({ "id": public_ip_id(rg, ip) });
    }

    let mut doc = json!({
        "id": nic_id(rg, name),
        "name": name,
        "location": "westeurope",
        "properties": {
            "ipConfigurations": [{
                "id": format!("{}/ipConfigurations/ipconfig1", nic_id(rg, name)),
                "name": "ipconfig1",
                "properties": properties
            }]
        }
    });
    if let Some(vm) = vm {
        doc["properties"]["virtualMachine"] = json!({ "id": vm_id(rg, vm) });
    }

    serde_json::from_value(doc).unwrap()
}

pub fn public_ip(rg: &str, name: &str, address: Option<&str>) -> PublicIpAddress {
    let mut properties = json!({ "provisioningState": "Succeeded" });
    if let Some(address) = address {
        properties["ipAddress"] = json!(address);
    }

    serde_json::from_value(json!({
        "id": public_ip_id(rg, name),
        "name": name,
        "location": "westeurope",
        "sku": { "name": "Standard" },
        "properties": properties
    }))
    .unwrap()
}

pub fn virtual_machine(rg: &str, name: &str) -> VirtualMachine {
    serde_json::from_value(json!({
        "id": vm_id(rg, name),
        "name": name,
        "location": "westeurope"
    }))
    .unwrap()
}
