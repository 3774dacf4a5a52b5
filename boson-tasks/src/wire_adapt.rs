// Copyright 2026 Boson Contributors.
//
// This software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, this software is distributed
// under the GPL Licence on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
// either express or implied. Please review the Licence for the specific language governing
// permissions and limitations relating to use of this software.

use boson_core::NodeContact;
use boson_wire::messages::WireNode;
use std::net::SocketAddr;

pub fn wire_node_to_contact(node: &WireNode) -> NodeContact {
    NodeContact::new(node.id, SocketAddr::new(node.ip, node.port))
}

pub fn contact_to_wire_node(contact: &NodeContact) -> WireNode {
    WireNode {
        id: contact.id,
        ip: contact.address.ip(),
        port: contact.address.port(),
    }
}
